pub mod sentence_divider;
pub mod tts_preprocessor;
