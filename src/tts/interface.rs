use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("TTS request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("TTS connection error: {0}")]
    Network(String),

    #[error("failed to write audio file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        TtsError::Network(err.to_string())
    }
}

/// Text-to-speech engine producing MP3 audio.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize `text` and return the encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;

    fn name(&self) -> &str;
}
