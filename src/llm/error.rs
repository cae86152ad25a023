use thiserror::Error;

/// Failures talking to the chat-completions provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("DeepSeek API key is not configured")]
    MissingApiKey,

    #[error("DeepSeek API request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("DeepSeek API rate limit exceeded")]
    RateLimited,

    #[error("HTTP connection error: {0}")]
    Network(String),

    #[error("invalid DeepSeek API response: {0}")]
    InvalidResponse(String),

    #[error("DeepSeek API failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::MissingApiKey | LlmError::RetriesExhausted { .. })
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
