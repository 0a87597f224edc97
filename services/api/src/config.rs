use havruta_core::capability::ProviderSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// The single provider credential. `None` disables every capability instead of failing.
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
    pub stt_language: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on a single provider call, in seconds.
    pub request_timeout_secs: u64,
    pub run_dir: PathBuf,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let temperature_str = var_or("TEMPERATURE", "0.4");
        let temperature = temperature_str
            .parse::<f32>()
            .ok()
            .filter(|t| (0.0..=2.0).contains(t))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TEMPERATURE".to_string(),
                    format!("'{}' is not a number between 0.0 and 2.0", temperature_str),
                )
            })?;

        let max_tokens_str = var_or("MAX_TOKENS", "600");
        let max_tokens = max_tokens_str
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "MAX_TOKENS".to_string(),
                    format!("'{}' is not a positive integer", max_tokens_str),
                )
            })?;

        let timeout_str = var_or("REQUEST_TIMEOUT_SECS", "60");
        let request_timeout_secs = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                )
            })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_api_base: var_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
            chat_model: var_or("CHAT_MODEL", "gpt-4o"),
            tts_model: var_or("TTS_MODEL", "gpt-4o-mini-tts"),
            tts_voice: var_or("TTS_VOICE", "alloy"),
            stt_model: var_or("STT_MODEL", "whisper-1"),
            stt_language: var_or("STT_LANGUAGE", "ko"),
            temperature,
            max_tokens,
            request_timeout_secs,
            run_dir: PathBuf::from(var_or("RUN_DIR", "havruta_runs")),
            log_level,
            prompts_path: PathBuf::from(var_or("PROMPTS_PATH", "./prompts")),
        })
    }

    /// The subset of settings the capability factory needs.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            api_key: self.openai_api_key.clone(),
            api_base: self.openai_api_base.clone(),
            chat_model: self.chat_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tts_model: self.tts_model.clone(),
            tts_voice: self.tts_voice.clone(),
            stt_model: self.stt_model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
