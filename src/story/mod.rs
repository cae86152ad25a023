pub mod error;
pub mod parser;
pub mod prompts;
pub mod service;

pub use error::StoryError;
pub use service::StoryService;
