mod config;
mod error;
mod handlers;
mod llm;
mod models;
mod routes;
mod state;
mod story;
mod tts;
mod utils;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rawi_backend=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;

    info!("Server settings:");
    info!("Host: {}", config.backend_host);
    info!("Port: {}", config.backend_port);
    info!("Base URL: {}", config.base_url());
    info!("Audio storage path: {}", config.audio_storage_path.display());
    info!("DeepSeek API key set: {}", config.has_api_key());
    if !config.has_api_key() {
        warn!("DEEPSEEK_API_KEY is not set; story generation will fail");
    }

    std::fs::create_dir_all(&config.audio_storage_path).with_context(|| {
        format!(
            "failed to create audio storage directory {}",
            config.audio_storage_path.display()
        )
    })?;
    info!("Created/verified audio storage directory");

    let addr: SocketAddr = format!("{}:{}", config.backend_host, config.backend_port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.backend_host, config.backend_port))?;
    let story_ttl = config.story_ttl();

    let app_state = AppState::new(config)?;
    if let Some(ttl) = story_ttl {
        app_state.spawn_eviction(ttl);
    }

    let app = routes::create_app(app_state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
