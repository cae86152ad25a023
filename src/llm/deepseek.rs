use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::LlmError;
use super::interface::{ChatMessage, ChatModel};
use crate::config::Config;

/// Client for DeepSeek's OpenAI-compatible chat completions endpoint.
///
/// Every call is retried with exponential backoff (`backoff_factor * 2^attempt`
/// seconds) on rate limiting, non-success statuses, transport failures and
/// malformed bodies. A missing API key fails immediately.
pub struct DeepSeekClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retries: u32,
    backoff_factor: f64,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl DeepSeekClient {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {}", e)))?;

        info!("Initialized DeepSeekClient: model={}, api_url={}", model, api_url);

        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            temperature: 0.7,
            max_tokens: 1000,
            retries: 3,
            backoff_factor: 1.5,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Ok(Self::new(
            config.deepseek_api_url.clone(),
            config.deepseek_api_key.clone(),
            config.deepseek_model.clone(),
            config.llm_timeout(),
        )?
        .with_sampling(config.llm_temperature, config.llm_max_tokens)
        .with_retries(config.llm_retries, config.llm_backoff_factor))
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retries(mut self, retries: u32, backoff_factor: f64) -> Self {
        self.retries = retries.max(1);
        self.backoff_factor = backoff_factor;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(attempt as i32))
    }

    async fn send_once(&self, api_key: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contains no choices".to_string()))
    }
}

#[async_trait]
impl ChatModel for DeepSeekClient {
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let mut last_error = None;
        for attempt in 0..self.retries {
            match self.send_once(api_key, messages).await {
                Ok(content) => {
                    debug!("DeepSeek reply received, length={}", content.chars().count());
                    return Ok(content);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("DeepSeek attempt {}/{} failed: {}", attempt + 1, self.retries, e);
                    last_error = Some(e);
                    if attempt + 1 < self.retries {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.retries,
            last: Box::new(last_error.unwrap_or(LlmError::RateLimited)),
        })
    }

    fn name(&self) -> &str {
        "deepseek"
    }
}
