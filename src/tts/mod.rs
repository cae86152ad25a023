pub mod interface;
pub mod google;
pub mod audio;

pub use interface::TtsEngine;
pub use google::GoogleTts;
pub use audio::{AudioError, AudioService};
