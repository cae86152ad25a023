pub mod error;
pub mod interface;
pub mod deepseek;
#[cfg(test)]
pub mod mock;

pub use error::LlmError;
pub use interface::{ChatMessage, ChatModel, Role};
pub use deepseek::DeepSeekClient;
