use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::llm::{ChatModel, DeepSeekClient};
use crate::story::StoryService;
use crate::tts::{AudioService, GoogleTts, TtsEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stories: Arc<StoryService>,
    pub audio: Arc<AudioService>,
}

impl AppState {
    /// Wire the production DeepSeek and Google TTS clients.
    pub fn new(config: Config) -> Result<Self> {
        let llm: Arc<dyn ChatModel> = Arc::new(DeepSeekClient::from_config(&config)?);
        let tts: Arc<dyn TtsEngine> = Arc::new(GoogleTts::from_config(&config)?);
        Ok(Self::with_engines(config, llm, tts))
    }

    pub fn with_engines(config: Config, llm: Arc<dyn ChatModel>, tts: Arc<dyn TtsEngine>) -> Self {
        info!("Using chat model {} and speech engine {}", llm.name(), tts.name());
        let stories = Arc::new(StoryService::new(llm));
        let audio = Arc::new(AudioService::new(
            tts,
            config.audio_storage_path.clone(),
            config.base_url().to_string(),
        ));

        Self {
            config: Arc::new(config),
            stories,
            audio,
        }
    }

    /// Evict idle stories together with their narrations.
    pub async fn evict_stale(&self, ttl: Duration) -> usize {
        let evicted = self.stories.evict_stale(ttl);
        for story_id in &evicted {
            self.audio.forget(story_id).await;
        }
        evicted.len()
    }

    pub fn spawn_eviction(&self, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(300));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let evicted = state.evict_stale(ttl).await;
                if evicted > 0 {
                    info!("Evicted {} idle stories, {} remaining", evicted, state.stories.len());
                }
            }
        })
    }
}
