use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/stories", story_routes())
        // Generated narrations
        .nest_service("/audio", ServeDir::new(&state.config.audio_storage_path))
}

fn story_routes() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(handlers::create_story))
        .route("/continue", post(handlers::continue_story))
        .route("/story/:story_id", get(handlers::get_story))
        .route("/tts", post(handlers::generate_tts))
        .route("/audio/:filename", get(handlers::get_audio_file))
        .route("/edit", post(handlers::edit_story))
}

/// Full application with middleware, ready to serve.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::mock::MockChatModel;
    use crate::llm::LlmError;
    use crate::tts::audio::tests::EchoTts;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const OPENING: &str = "الفقرة:\nاستيقظت سارة على صوت غريب.\n\nالخيارات:\n1. سارة تفتح النافذة\n2. سارة توقظ أخاها\n3. سارة تختبئ";
    const MIDDLE: &str = "الفقرة:\nكان الصوت قطة جائعة.\n\nالخيارات:\n1. سارة تطعم القطة\n2. سارة تطرد القطة";
    const ENDING: &str = "الفقرة:\nصارت القطة صديقتها.\n\nالعنوان:\nقطة منتصف الليل";

    struct TestApp {
        app: Router,
        llm: Arc<MockChatModel>,
        _dir: tempfile::TempDir,
    }

    fn test_app(api_key: Option<&str>) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            base_url: Some("http://rawi.test".to_string()),
            audio_storage_path: dir.path().to_path_buf(),
            deepseek_api_key: api_key.map(str::to_string),
            ..Config::default()
        };
        let llm = Arc::new(MockChatModel::new());
        let state = AppState::with_engines(config, llm.clone(), Arc::new(EchoTts::default()));
        TestApp {
            app: create_app(state),
            llm,
            _dir: dir,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn short_story() -> Value {
        json!({
            "length": "short",
            "primary_type": "غموض",
            "secondary_type": "كوميدي",
            "characters": [{"name": "سارة", "gender": "أنثى", "description": "فتاة فضولية"}]
        })
    }

    #[tokio::test]
    async fn test_health_degraded_without_key() {
        let t = test_app(None);
        let (status, body) = send_json(&t.app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["deepseek_api"], false);
        assert_eq!(body["audio_storage"], true);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_health_with_key() {
        let t = test_app(Some("sk-test"));
        let (_, body) = send_json(&t.app, "GET", "/health", None).await;
        assert_eq!(body["status"], "healthy");
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_root() {
        let t = test_app(None);
        let (status, body) = send_json(&t.app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["health"], "http://rawi.test/health");
    }

    #[tokio::test]
    async fn test_full_story_flow() {
        let t = test_app(Some("sk-test"));
        for reply in [OPENING, MIDDLE, ENDING] {
            t.llm.add_reply(reply);
        }

        let (status, body) = send_json(&t.app, "POST", "/api/stories/initialize", Some(short_story())).await;
        assert_eq!(status, StatusCode::OK);
        let story_id = body["story_id"].as_str().unwrap().to_string();
        assert_eq!(body["is_complete"], false);
        assert_eq!(body["paragraph"]["choices"][2]["text"], "سارة تختبئ");
        assert!(body["title"].is_null());

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": story_id, "choice_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paragraph"]["choices"].as_array().unwrap().len(), 2);

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": story_id, "custom_text": "سارة تحمل القطة"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_complete"], true);
        assert!(body["paragraph"]["choices"].is_null());
        assert_eq!(body["title"], "قطة منتصف الليل");

        let (status, body) =
            send_json(&t.app, "GET", &format!("/api/stories/story/{}", story_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap().starts_with("قصة بعنوان قطة منتصف الليل."));

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/tts",
            Some(json!({"story_id": story_id, "speed": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let audio_url = body["audio_url"].as_str().unwrap();
        assert!(audio_url.starts_with("http://rawi.test/audio/"));
        assert!(audio_url.ends_with("?speed=1.5"));

        let static_path = audio_url.trim_start_matches("http://rawi.test");
        let (status, static_bytes) = send(&t.app, "GET", static_path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(static_bytes.clone()).unwrap().contains("قطة منتصف الليل"));

        let filename = static_path
            .trim_start_matches("/audio/")
            .split('?')
            .next()
            .unwrap();
        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/stories/audio/{}", filename))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(
            response.headers()["content-disposition"],
            format!("attachment; filename=\"{}\"", filename).as_str()
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), static_bytes);

        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/stories/audio/{}", filename))
                    .header("range", "bytes=0-3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), static_bytes[..4].to_vec());
    }

    #[tokio::test]
    async fn test_continue_errors() {
        let t = test_app(Some("sk-test"));
        t.llm.add_reply(OPENING);
        let (_, body) = send_json(&t.app, "POST", "/api/stories/initialize", Some(short_story())).await;
        let story_id = body["story_id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": story_id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "يجب تحديد اختيار أو إدخال نص مخصص");

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": story_id, "choice_id": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "معرف الاختيار غير صالح");

        let (status, _) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": "missing", "choice_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        t.llm.add_error(LlmError::RateLimited);
        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/continue",
            Some(json!({"story_id": story_id, "choice_id": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("حدث خطأ أثناء متابعة القصة"));
    }

    #[tokio::test]
    async fn test_initialize_failure_is_500() {
        let t = test_app(None);
        t.llm.add_error(LlmError::MissingApiKey);
        let (status, body) = send_json(&t.app, "POST", "/api/stories/initialize", Some(short_story())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("حدث خطأ أثناء إنشاء القصة"));
    }

    #[tokio::test]
    async fn test_invalid_story_config_is_rejected() {
        let t = test_app(None);
        let (status, _) = send(
            &t.app,
            "POST",
            "/api/stories/initialize",
            Some(json!({"length": "epic", "primary_type": "رعب"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(t.llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_story_endpoints() {
        let t = test_app(None);

        let (status, body) = send_json(&t.app, "GET", "/api/stories/story/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "معرف القصة غير صالح");

        let (status, _) = send_json(
            &t.app,
            "POST",
            "/api/stories/tts",
            Some(json!({"story_id": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(
            &t.app,
            "POST",
            "/api/stories/edit",
            Some(json!({"story_id": "missing", "edit_instructions": "أطول"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tts_speed_out_of_range() {
        let t = test_app(None);
        let (status, _) = send_json(
            &t.app,
            "POST",
            "/api/stories/tts",
            Some(json!({"story_id": "any", "speed": 3.0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_audio_file_errors() {
        let t = test_app(None);
        let (status, body) = send_json(&t.app, "GET", "/api/stories/audio/nothing.mp3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "الملف الصوتي غير موجود");

        let (status, _) = send_json(&t.app, "GET", "/api/stories/audio/..", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_edit_story() {
        let t = test_app(Some("sk-test"));
        t.llm.add_reply(OPENING);
        t.llm.add_reply("العنوان الجديد: سر النافذة\nفقرة جديدة.\n\nفقرة أخرى.");
        let (_, body) = send_json(&t.app, "POST", "/api/stories/initialize", Some(short_story())).await;
        let story_id = body["story_id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &t.app,
            "POST",
            "/api/stories/edit",
            Some(json!({"story_id": story_id, "edit_instructions": "غيّر العنوان"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["paragraphs"], json!(["فقرة جديدة.", "فقرة أخرى."]));
        assert_eq!(body["title"], "سر النافذة");
    }
}
