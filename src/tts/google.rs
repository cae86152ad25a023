use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::interface::{TtsEngine, TtsError};
use crate::config::Config;
use crate::utils::sentence_divider::{split_for_tts, MAX_TTS_CHUNK_CHARS};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Google Translate speech endpoint. Text is sent in chunks of at most
/// 100 characters and the returned MP3 segments are concatenated.
pub struct GoogleTts {
    client: Client,
    endpoint: String,
    language: String,
}

impl GoogleTts {
    pub fn new(endpoint: String, language: String) -> Result<Self, TtsError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        info!("Initialized GoogleTts: endpoint={}, language={}", endpoint, language);
        Ok(Self { client, endpoint, language })
    }

    pub fn from_config(config: &Config) -> Result<Self, TtsError> {
        Self::new(config.tts_endpoint.clone(), config.tts_language.clone())
    }
}

#[async_trait]
impl TtsEngine for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let chunks = split_for_tts(text, MAX_TTS_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(TtsError::EmptyText);
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.language.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TtsError::Api { status: status.as_u16(), body });
            }
            audio.extend_from_slice(&response.bytes().await?);
        }

        debug!("Synthesized {} chunks, {} bytes", chunks.len(), audio.len());
        Ok(audio)
    }

    fn name(&self) -> &str {
        "google_translate"
    }
}
