use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::StoryError;
use super::parser::{clean_title, parse_edit_reply, parse_reply};
use super::prompts;
use crate::llm::{ChatMessage, ChatModel, LlmError, Role};
use crate::models::{StoryConfig, StoryParagraph, StoryResponse};

/// Server-side state of one story.
#[derive(Debug, Clone)]
pub struct StoryRecord {
    pub config: StoryConfig,
    pub paragraphs: Vec<String>,
    pub current_paragraph: usize,
    pub max_paragraphs: usize,
    pub messages: Vec<ChatMessage>,
    pub title: Option<String>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryRecord {
    /// Full narration text, prefixed with the title when known.
    pub fn complete_text(&self) -> String {
        let body = self.paragraphs.join("\n\n");
        match &self.title {
            Some(title) => format!("قصة بعنوان {}.\n\n{}", title, body),
            None => body,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub paragraphs: Vec<String>,
    pub title: Option<String>,
}

/// In-memory story store driving the chat model.
///
/// Each record sits behind its own async mutex which stays locked across the
/// model call, so turns on one story are applied in order.
pub struct StoryService {
    llm: Arc<dyn ChatModel>,
    stories: DashMap<String, Arc<Mutex<StoryRecord>>>,
}

impl StoryService {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            llm,
            stories: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn contains(&self, story_id: &str) -> bool {
        self.stories.contains_key(story_id)
    }

    fn get(&self, story_id: &str) -> Result<Arc<Mutex<StoryRecord>>, StoryError> {
        self.stories
            .get(story_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoryError::NotFound)
    }

    pub async fn initialize(&self, config: StoryConfig) -> Result<StoryResponse, StoryError> {
        let story_id = Uuid::new_v4().to_string();
        let (max_paragraphs, _) = prompts::length_instructions(config.length);

        let mut messages = vec![
            ChatMessage::system(prompts::system_prompt()),
            ChatMessage::user(prompts::story_init_prompt(&config)),
        ];
        let reply = self.llm.chat_completion(&messages).await?;
        let parsed = parse_reply(&reply);
        messages.push(ChatMessage::assistant(reply));

        let now = Utc::now();
        let record = StoryRecord {
            config,
            paragraphs: vec![parsed.paragraph.clone()],
            current_paragraph: 1,
            max_paragraphs,
            messages,
            title: None,
            is_complete: false,
            created_at: now,
            updated_at: now,
        };
        self.stories.insert(story_id.clone(), Arc::new(Mutex::new(record)));
        info!("Initialized story {} ({} paragraphs)", story_id, max_paragraphs);

        Ok(StoryResponse {
            story_id,
            paragraph: StoryParagraph {
                content: parsed.paragraph,
                choices: parsed.choices,
            },
            is_complete: false,
            title: None,
        })
    }

    pub async fn continue_with_choice(
        &self,
        story_id: &str,
        choice_id: i64,
    ) -> Result<StoryResponse, StoryError> {
        let story = self.get(story_id)?;
        let mut record = story.lock().await;
        if record.is_complete {
            return Err(StoryError::AlreadyComplete);
        }

        let last_reply = record
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let choices = parse_reply(last_reply).choices.unwrap_or_default();
        let choice = usize::try_from(choice_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| choices.get(index))
            .ok_or(StoryError::InvalidChoice)?;

        let prompt = prompts::continuation_prompt(
            &record.paragraphs.join("\n"),
            choice.id,
            &choice.text,
            record.current_paragraph,
            record.max_paragraphs,
        );
        debug!("Continuing story {} with choice {}", story_id, choice.id);
        self.advance(story_id, &mut record, prompt).await
    }

    pub async fn continue_with_text(
        &self,
        story_id: &str,
        custom_text: &str,
    ) -> Result<StoryResponse, StoryError> {
        let story = self.get(story_id)?;
        let mut record = story.lock().await;
        if record.is_complete {
            return Err(StoryError::AlreadyComplete);
        }

        let prompt = prompts::custom_text_prompt(
            &record.paragraphs.join("\n"),
            custom_text,
            record.current_paragraph,
            record.max_paragraphs,
        );
        debug!("Continuing story {} with custom text", story_id);
        self.advance(story_id, &mut record, prompt).await
    }

    /// Send one continuation turn and fold the reply into the record.
    /// History is only extended once the model has answered.
    async fn advance(
        &self,
        story_id: &str,
        record: &mut StoryRecord,
        prompt: String,
    ) -> Result<StoryResponse, StoryError> {
        let mut messages = record.messages.clone();
        messages.push(ChatMessage::user(prompt));
        let reply = self.llm.chat_completion(&messages).await?;
        let parsed = parse_reply(&reply);
        messages.push(ChatMessage::assistant(reply));

        let is_complete =
            prompts::is_final_paragraph(record.current_paragraph, record.max_paragraphs);
        record.paragraphs.push(parsed.paragraph.clone());
        record.current_paragraph += 1;
        record.messages = messages;
        record.is_complete = is_complete;
        if is_complete && parsed.title.is_some() {
            record.title = parsed.title;
        }
        record.touch();

        if is_complete {
            info!(
                "Story {} ({}) complete after {} paragraphs ({}s)",
                story_id,
                record.config.primary_type.label(),
                record.paragraphs.len(),
                (record.updated_at - record.created_at).num_seconds()
            );
        }

        Ok(StoryResponse {
            story_id: story_id.to_string(),
            paragraph: StoryParagraph {
                content: parsed.paragraph,
                choices: if is_complete { None } else { parsed.choices },
            },
            is_complete,
            title: if is_complete { record.title.clone() } else { None },
        })
    }

    pub async fn complete_text(&self, story_id: &str) -> Result<String, StoryError> {
        let story = self.get(story_id)?;
        let record = story.lock().await;
        Ok(record.complete_text())
    }

    /// Return the story title, asking the model for one if the story has none yet.
    pub async fn ensure_title(&self, story_id: &str) -> Result<String, StoryError> {
        let story = self.get(story_id)?;
        let mut record = story.lock().await;
        if let Some(title) = &record.title {
            return Ok(title.clone());
        }

        let messages = [
            ChatMessage::system(prompts::system_prompt()),
            ChatMessage::user(prompts::title_prompt(&record.complete_text())),
        ];
        let title = clean_title(&self.llm.chat_completion(&messages).await?);
        debug!("Generated title for story {}: {}", story_id, title);

        record.title = Some(title.clone());
        record.touch();
        Ok(title)
    }

    /// Rewrite the whole story following free-form instructions.
    pub async fn edit(&self, story_id: &str, instructions: &str) -> Result<EditOutcome, StoryError> {
        let story = self.get(story_id)?;
        let mut record = story.lock().await;

        let messages = [
            ChatMessage::system(prompts::edit_system_prompt()),
            ChatMessage::user(prompts::edit_user_prompt(&record.paragraphs.join("\n"), instructions)),
        ];
        let reply = self.llm.chat_completion(&messages).await?;
        let (paragraphs, new_title) = parse_edit_reply(&reply);
        if paragraphs.is_empty() {
            return Err(LlmError::InvalidResponse("edited story is empty".to_string()).into());
        }

        record.paragraphs = paragraphs.clone();
        if new_title.is_some() {
            record.title = new_title;
        }
        record.touch();
        info!("Edited story {} ({} paragraphs)", story_id, paragraphs.len());

        Ok(EditOutcome {
            paragraphs,
            title: record.title.clone(),
        })
    }

    /// Drop stories idle for longer than `ttl` and return their ids. Stories
    /// in use by a request, locked or not yet locked, are kept.
    pub fn evict_stale(&self, ttl: Duration) -> Vec<String> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36500));
        let cutoff = Utc::now() - ttl;
        let mut evicted = Vec::new();
        self.stories.retain(|story_id, story| {
            if Arc::strong_count(story) > 1 {
                return true;
            }
            let keep = story
                .try_lock()
                .map(|record| record.updated_at > cutoff)
                .unwrap_or(true);
            if !keep {
                evicted.push(story_id.clone());
            }
            keep
        });
        evicted
    }
}
