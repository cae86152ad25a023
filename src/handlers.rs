use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    Json,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info};

use crate::error::ApiError;
use crate::models::{
    ChoiceRequest, EditRequest, EditResponse, StoryConfig, StoryResponse, TTSRequest, TTSResponse,
    MAX_SPEED, MIN_SPEED,
};
use crate::state::AppState;
use crate::story::StoryError;
use crate::tts::AudioError;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "مرحباً بك في واجهة برمجة تطبيقات راوي",
        "health": format!("{}/health", state.config.base_url()),
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let has_key = state.config.has_api_key();
    let audio_storage = tokio::fs::try_exists(state.audio.storage_dir())
        .await
        .unwrap_or(false);

    let mut health = json!({
        "status": if has_key { "healthy" } else { "degraded" },
        "deepseek_api": has_key,
        "audio_storage": audio_storage,
    });
    if !has_key {
        health["message"] =
            json!("DeepSeek API key is not set. Story generation will not work.");
    }
    Json(health)
}

pub async fn create_story(
    State(state): State<AppState>,
    Json(config): Json<StoryConfig>,
) -> Result<Json<StoryResponse>, ApiError> {
    info!("Initializing story: {:?}", config);
    let response = state
        .stories
        .initialize(config)
        .await
        .map_err(|e| ApiError::internal("حدث خطأ أثناء إنشاء القصة", e))?;
    Ok(Json(response))
}

pub async fn continue_story(
    State(state): State<AppState>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<StoryResponse>, ApiError> {
    info!("Continuing story {}", request.story_id);

    let result = if let Some(choice_id) = request.choice_id {
        state.stories.continue_with_choice(&request.story_id, choice_id).await
    } else if let Some(custom_text) = request.custom_text.as_deref() {
        state.stories.continue_with_text(&request.story_id, custom_text).await
    } else {
        Err(StoryError::MissingContinuation)
    };

    let response = result.map_err(|e| match e {
        StoryError::Llm(e) => ApiError::internal("حدث خطأ أثناء متابعة القصة", e),
        other => ApiError::BadRequest(other.to_string()),
    })?;

    state.audio.invalidate(&request.story_id).await;
    Ok(Json(response))
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> Result<Json<String>, ApiError> {
    let text = state.stories.complete_text(&story_id).await.map_err(|e| match e {
        StoryError::NotFound => ApiError::NotFound(e.to_string()),
        other => ApiError::internal("حدث خطأ أثناء استرجاع القصة", other),
    })?;
    Ok(Json(text))
}

pub async fn generate_tts(
    State(state): State<AppState>,
    Json(request): Json<TTSRequest>,
) -> Result<Json<TTSResponse>, ApiError> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&request.speed) {
        return Err(ApiError::UnprocessableEntity(format!(
            "speed must be between {} and {}",
            MIN_SPEED, MAX_SPEED
        )));
    }
    info!("Generating TTS for story {} at speed {}", request.story_id, request.speed);

    let filename = state
        .audio
        .generate_for_story(&state.stories, &request.story_id)
        .await
        .map_err(|e| match e {
            AudioError::Story(StoryError::NotFound) => ApiError::NotFound(e.to_string()),
            other => ApiError::internal("حدث خطأ أثناء توليد الصوت", other),
        })?;

    let audio_url = state.audio.audio_url(&filename, request.speed);
    info!("Audio URL: {}", audio_url);
    Ok(Json(TTSResponse { audio_url }))
}

pub async fn get_audio_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = state
        .audio
        .resolve(&filename)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(audio_not_found(&path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(audio_not_found(&path)),
        Err(e) => return Err(ApiError::internal("حدث خطأ أثناء استرجاع الملف الصوتي", e)),
    }

    info!("Serving audio file: {}", path.display());
    let mut response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal("حدث خطأ أثناء استرجاع الملف الصوتي", e))?
        .map(Body::new);

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

fn audio_not_found(path: &std::path::Path) -> ApiError {
    error!("Audio file not found: {}", path.display());
    ApiError::NotFound("الملف الصوتي غير موجود".to_string())
}

pub async fn edit_story(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    info!("Editing story {}: {}", request.story_id, request.edit_instructions);

    let outcome = state
        .stories
        .edit(&request.story_id, &request.edit_instructions)
        .await
        .map_err(|e| match e {
            StoryError::NotFound => ApiError::NotFound(e.to_string()),
            other => ApiError::internal("حدث خطأ أثناء تعديل القصة", other),
        })?;

    state.audio.invalidate(&request.story_id).await;
    Ok(Json(EditResponse {
        success: true,
        paragraphs: outcome.paragraphs,
        title: outcome.title,
    }))
}
