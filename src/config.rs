use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Result;

/// Runtime settings, layered as defaults -> optional config file -> environment.
///
/// Environment variables map onto fields by lowercasing, so `BACKEND_PORT`
/// sets `backend_port` and `DEEPSEEK_API_KEY` sets `deepseek_api_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub backend_host: String,
    #[serde(default = "default_port")]
    pub backend_port: u16,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_audio_storage_path")]
    pub audio_storage_path: PathBuf,

    #[serde(default)]
    pub deepseek_api_key: Option<String>,
    #[serde(default = "default_deepseek_api_url")]
    pub deepseek_api_url: String,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
    #[serde(default = "default_temperature")]
    pub llm_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub llm_max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_llm_retries")]
    pub llm_retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub llm_backoff_factor: f64,

    #[serde(default = "default_tts_endpoint")]
    pub tts_endpoint: String,
    #[serde(default = "default_tts_language")]
    pub tts_language: String,

    #[serde(default = "default_story_ttl_secs")]
    pub story_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_audio_storage_path() -> PathBuf {
    PathBuf::from("./audio_files")
}

fn default_deepseek_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_llm_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_tts_endpoint() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_tts_language() -> String {
    "ar".to_string()
}

fn default_story_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Config {
    /// Load settings from `CONFIG_PATH` (if set) and the process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").ok();
        Self::load_from(path.as_deref(), true)
    }

    /// Load settings from an optional file, optionally overlaid with environment variables.
    pub fn load_from(path: Option<&str>, with_env: bool) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !Path::new(path).exists() {
                anyhow::bail!("Configuration file not found: {}", path);
            }
            builder = builder.add_source(config::File::from(Path::new(path)));
        }

        if with_env {
            builder = builder.add_source(config::Environment::default().try_parsing(true));
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.finalize()
    }

    fn finalize(mut self) -> Result<Self> {
        if self.base_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
            self.base_url = Some(format!("http://{}:{}", self.backend_host, self.backend_port));
        }
        if let Some(base_url) = self.base_url.as_mut() {
            while base_url.ends_with('/') {
                base_url.pop();
            }
        }
        if self.deepseek_api_key.as_deref().map(str::trim) == Some("") {
            self.deepseek_api_key = None;
        }
        if self.audio_storage_path.is_relative() {
            self.audio_storage_path = std::env::current_dir()?.join(&self.audio_storage_path);
        }
        if self.llm_backoff_factor < 0.0 {
            anyhow::bail!("llm_backoff_factor must not be negative");
        }
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }

    pub fn has_api_key(&self) -> bool {
        self.deepseek_api_key.is_some()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn story_ttl(&self) -> Option<Duration> {
        (self.story_ttl_secs > 0).then(|| Duration::from_secs(self.story_ttl_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_host: default_host(),
            backend_port: default_port(),
            base_url: None,
            audio_storage_path: default_audio_storage_path(),
            deepseek_api_key: None,
            deepseek_api_url: default_deepseek_api_url(),
            deepseek_model: default_deepseek_model(),
            llm_temperature: default_temperature(),
            llm_max_tokens: default_max_tokens(),
            llm_timeout_secs: default_llm_timeout_secs(),
            llm_retries: default_llm_retries(),
            llm_backoff_factor: default_backoff_factor(),
            tts_endpoint: default_tts_endpoint(),
            tts_language: default_tts_language(),
            story_ttl_secs: default_story_ttl_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 5] = [
        "BACKEND_HOST",
        "BACKEND_PORT",
        "BASE_URL",
        "AUDIO_STORAGE_PATH",
        "CONFIG_PATH",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = Config::load_from(None, false).unwrap();
        assert_eq!(config.backend_host, "0.0.0.0");
        assert_eq!(config.backend_port, 7860);
        assert_eq!(config.base_url(), "http://0.0.0.0:7860");
        assert!(config.audio_storage_path.is_absolute());
        assert!(config.audio_storage_path.ends_with("audio_files"));
        assert!(!config.has_api_key());
        assert_eq!(config.deepseek_model, "deepseek-chat");
        assert_eq!(config.llm_retries, 3);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "backend_port: 9000\nbase_url: \"https://example.hf.space/\"\ndeepseek_api_key: \"sk-test\"\nstory_ttl_secs: 0"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load_from(Some(&path), false).unwrap();

        assert_eq!(config.backend_port, 9000);
        assert_eq!(config.base_url(), "https://example.hf.space");
        assert!(config.has_api_key());
        assert!(config.story_ttl().is_none());
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "deepseek_api_key: \"  \"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::load_from(Some(&path), false).unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load_from(Some("/nonexistent/rawi.yaml"), false).is_err());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        clear_env();
        std::env::set_var("BACKEND_HOST", "127.0.0.1");
        std::env::set_var("BACKEND_PORT", "9100");
        std::env::set_var("BASE_URL", "https://abc.hf.space/");
        std::env::set_var("AUDIO_STORAGE_PATH", dir.path());

        let config = Config::load();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.backend_host, "127.0.0.1");
        assert_eq!(config.backend_port, 9100);
        assert_eq!(config.base_url(), "https://abc.hf.space");
        assert_eq!(config.audio_storage_path, dir.path());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "backend_port: 9000\nbackend_host: \"10.0.0.1\"").unwrap();
        clear_env();
        std::env::set_var("CONFIG_PATH", file.path());
        std::env::set_var("BACKEND_PORT", "9200");

        let config = Config::load();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.backend_port, 9200);
        assert_eq!(config.backend_host, "10.0.0.1");
        assert_eq!(config.base_url(), "http://10.0.0.1:9200");
    }
}
