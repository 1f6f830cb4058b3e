use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub chats_table: Option<String>,
    pub s3_bucket: Option<String>,
    pub analysis_config_path: Option<PathBuf>,
    pub bind_host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("LLM_API_KEY")
            .or_else(|| get("GROQ_API_KEY"))
            .ok_or(ConfigError::Missing("LLM_API_KEY"))?;

        let base_url = get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::Invalid(format!("LLM_BASE_URL: {}", e)))?;

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(format!("LLM_TIMEOUT_SECS: {}", v)))?,
            None => 30,
        };

        let port = match get("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("PORT: {}", v)))?,
            None => 8000,
        };

        Ok(Self {
            llm: LlmSettings {
                api_key,
                base_url,
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string()),
            chats_table: get("DYNAMODB_CHATS_TABLE"),
            s3_bucket: get("S3_BUCKET_NAME"),
            analysis_config_path: get("ANALYSIS_CONFIG").map(PathBuf::from),
            bind_host: get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}
