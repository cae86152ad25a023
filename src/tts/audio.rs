use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::interface::{TtsEngine, TtsError};
use crate::story::{StoryError, StoryService};
use crate::utils::tts_preprocessor::clean_text_for_tts;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Story(#[from] StoryError),

    #[error(transparent)]
    Tts(#[from] TtsError),

    #[error("invalid audio file name: {0}")]
    InvalidFilename(String),
}

const MAX_NARRATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
struct CachedAudio {
    filename: String,
    generation: u64,
}

/// Narrates stories into MP3 files under the audio storage directory and
/// remembers one file per story until the story text changes.
///
/// Every change of a story's text bumps its generation. A narration is only
/// served from the cache while its generation is current.
pub struct AudioService {
    engine: Arc<dyn TtsEngine>,
    storage_dir: PathBuf,
    base_url: String,
    files: DashMap<String, CachedAudio>,
    generations: DashMap<String, u64>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AudioService {
    pub fn new(engine: Arc<dyn TtsEngine>, storage_dir: PathBuf, base_url: String) -> Self {
        info!("Audio storage path: {}", storage_dir.display());
        Self {
            engine,
            storage_dir,
            base_url,
            files: DashMap::new(),
            generations: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn generation(&self, story_id: &str) -> u64 {
        self.generations.get(story_id).map(|g| *g).unwrap_or(0)
    }

    /// Cached narration of a story, if it still matches the story text.
    pub fn cached_file(&self, story_id: &str) -> Option<String> {
        let current = self.generation(story_id);
        self.files
            .get(story_id)
            .filter(|cached| cached.generation == current)
            .map(|cached| cached.filename.clone())
    }

    /// Return the audio file name for a story, synthesizing it on first use.
    ///
    /// When the story changes while it is being narrated, the stale file is
    /// dropped and the new text narrated instead.
    pub async fn generate_for_story(
        &self,
        stories: &StoryService,
        story_id: &str,
    ) -> Result<String, AudioError> {
        if !stories.contains(story_id) {
            return Err(StoryError::NotFound.into());
        }

        let lock = self
            .locks
            .entry(story_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(filename) = self.cached_file(story_id) {
            debug!("Reusing audio {} for story {}", filename, story_id);
            return Ok(filename);
        }
        if let Some((_, stale)) = self.files.remove(story_id) {
            self.remove_file(&stale.filename).await;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let generation = self.generation(story_id);

            stories.ensure_title(story_id).await?;
            let text = stories.complete_text(story_id).await?;

            let filename = format!("{}_{}.mp3", story_id, Uuid::new_v4().simple());
            self.text_to_speech(&text, &filename).await?;

            if self.generation(story_id) == generation || attempt >= MAX_NARRATION_ATTEMPTS {
                self.files.insert(
                    story_id.to_string(),
                    CachedAudio {
                        filename: filename.clone(),
                        generation,
                    },
                );
                return Ok(filename);
            }

            debug!("Story {} changed during narration, narrating again", story_id);
            self.remove_file(&filename).await;
        }
    }

    async fn text_to_speech(&self, text: &str, filename: &str) -> Result<(), AudioError> {
        tokio::fs::create_dir_all(&self.storage_dir)
            .await
            .map_err(TtsError::from)?;

        let path = self.storage_dir.join(filename);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        let cleaned = clean_text_for_tts(text);
        debug!(
            "Original text length: {}, cleaned text length: {}",
            text.chars().count(),
            cleaned.chars().count()
        );

        let audio = self.engine.synthesize(&cleaned).await?;
        tokio::fs::write(&path, audio).await.map_err(TtsError::from)?;
        info!("Wrote {} using {}", path.display(), self.engine.name());
        Ok(())
    }

    async fn remove_file(&self, filename: &str) {
        let path = self.storage_dir.join(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed stale audio file: {}", path.display()),
            Err(e) => warn!("Could not remove audio file {}: {}", path.display(), e),
        }
    }

    /// Mark the narration of a story whose text changed as stale and delete
    /// its file. A narration in flight for the old text is not cached.
    pub async fn invalidate(&self, story_id: &str) {
        *self.generations.entry(story_id.to_string()).or_insert(0) += 1;
        if let Some((_, cached)) = self.files.remove(story_id) {
            self.remove_file(&cached.filename).await;
        }
    }

    /// Drop everything kept for a story that no longer exists.
    pub async fn forget(&self, story_id: &str) {
        self.invalidate(story_id).await;
        self.generations.remove(story_id);
        self.locks.remove(story_id);
    }

    /// Public URL of an audio file. `speed` is a playback hint for the client.
    pub fn audio_url(&self, filename: &str, speed: f64) -> String {
        format!("{}/audio/{}?speed={:?}", self.base_url, filename, speed)
    }

    /// Path of `filename` inside the storage directory, rejecting anything
    /// that is not a plain file name.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, AudioError> {
        let is_plain = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && filename != "."
            && filename != ".."
            && Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename);

        if !is_plain {
            return Err(AudioError::InvalidFilename(filename.to_string()));
        }
        Ok(self.storage_dir.join(filename))
    }
}
