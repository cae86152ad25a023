//! Request and response payloads for the story API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

/// Story genre, serialized with its Arabic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryType {
    #[serde(rename = "رومانسي")]
    Romance,
    #[serde(rename = "رعب")]
    Horror,
    #[serde(rename = "كوميدي")]
    Comedy,
    #[serde(rename = "أكشن")]
    Action,
    #[serde(rename = "مغامرة")]
    Adventure,
    #[serde(rename = "دراما")]
    Drama,
    #[serde(rename = "خيال")]
    Fantasy,
    #[serde(rename = "تاريخي")]
    Historical,
    #[serde(rename = "غموض")]
    Mystery,
    #[serde(rename = "لا")]
    None,
}

impl StoryType {
    pub fn label(&self) -> &'static str {
        match self {
            StoryType::Romance => "رومانسي",
            StoryType::Horror => "رعب",
            StoryType::Comedy => "كوميدي",
            StoryType::Action => "أكشن",
            StoryType::Adventure => "مغامرة",
            StoryType::Drama => "دراما",
            StoryType::Fantasy => "خيال",
            StoryType::Historical => "تاريخي",
            StoryType::Mystery => "غموض",
            StoryType::None => "لا",
        }
    }
}

impl Default for StoryType {
    fn default() -> Self {
        StoryType::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterGender {
    #[serde(rename = "ذكر")]
    Male,
    #[serde(rename = "أنثى")]
    Female,
}

impl CharacterGender {
    pub fn label(&self) -> &'static str {
        match self {
            CharacterGender::Male => "ذكر",
            CharacterGender::Female => "أنثى",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub gender: CharacterGender,
    pub description: String,
}

/// Settings for a new story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryConfig {
    pub length: StoryLength,
    pub primary_type: StoryType,
    #[serde(default)]
    pub secondary_type: StoryType,
    #[serde(default)]
    pub characters: Vec<Character>,
}

/// Continue a story with either a numbered choice or free text.
/// `choice_id` wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceRequest {
    pub story_id: String,
    #[serde(default)]
    pub choice_id: Option<i64>,
    #[serde(default)]
    pub custom_text: Option<String>,
}

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TTSRequest {
    pub story_id: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    pub story_id: String,
    pub edit_instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryChoice {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryParagraph {
    pub content: String,
    pub choices: Option<Vec<StoryChoice>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResponse {
    pub story_id: String,
    pub paragraph: StoryParagraph,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TTSResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResponse {
    pub success: bool,
    pub paragraphs: Vec<String>,
    pub title: Option<String>,
}
