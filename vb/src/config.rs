//! VexusBot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main VexusBot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Completion service configuration
    pub llm: LlmConfig,

    /// Session/profile storage
    pub storage: StorageConfig,

    /// Travel guide corpus used for questions
    pub guide: GuideConfig,

    /// WhatsApp Cloud API transport
    pub whatsapp: WhatsAppConfig,

    /// Telegram Bot API transport
    pub telegram: TelegramConfig,

    /// Webhook server
    pub server: ServerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the completion service API key is available.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .vexusbot.yml
        let local_config = PathBuf::from(".vexusbot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/vexusbot/vexusbot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("vexusbot").join("vexusbot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or its alias "gemini", both speak the chat completions API)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL, `/chat/completions` is appended
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the session database
    #[serde(rename = "session-dir")]
    pub session_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let session_dir = dirs::data_local_dir()
            .map(|d| d.join("vexusbot"))
            .unwrap_or_else(|| PathBuf::from(".vexusbot"))
            .to_string_lossy()
            .into_owned();

        Self { session_dir }
    }
}

/// Travel guide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Guidestore directory
    #[serde(rename = "store-path")]
    pub store_path: String,

    /// Chunks handed to the completion service per question
    #[serde(rename = "top-k")]
    pub top_k: usize,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            store_path: guidestore::config::default_store_path().to_string_lossy().into_owned(),
            top_k: guidestore::DEFAULT_TOP_K,
        }
    }
}

/// WhatsApp Cloud API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Environment variable containing the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Sender phone number id
    #[serde(rename = "phone-number-id")]
    pub phone_number_id: String,

    /// Environment variable containing the webhook verify token
    #[serde(rename = "verify-token-env")]
    pub verify_token_env: String,

    /// Graph API base URL including the version
    #[serde(rename = "graph-url")]
    pub graph_url: String,

    /// Maximum characters per text message
    #[serde(rename = "message-limit")]
    pub message_limit: usize,
}

impl WhatsAppConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok()
    }

    pub fn verify_token(&self) -> Option<String> {
        std::env::var(&self.verify_token_env).ok()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            token_env: "WHATSAPP_TOKEN".to_string(),
            phone_number_id: String::new(),
            verify_token_env: "VERIFY_TOKEN".to_string(),
            graph_url: "https://graph.facebook.com/v21.0".to_string(),
            message_limit: 4096,
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Bot API base URL
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Maximum characters per text message
    #[serde(rename = "message-limit")]
    pub message_limit: usize,
}

impl TelegramConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAM_TOKEN".to_string(),
            api_url: "https://api.telegram.org".to_string(),
            message_limit: 4096,
        }
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:10000".to_string(),
        }
    }
}
