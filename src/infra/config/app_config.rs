// Runtime configuration, read from the process environment (after `.env`).
//
// Everything funnels through `from_lookup` so tests can hand in a closure
// over a fixed map instead of mutating the real environment.

use crate::core::ai::AiConfig;
use crate::core::credentials::{normalize, CredentialError, ServiceAccountKey};
use crate::infra::ai::DEFAULT_CHAT_URL;
use crate::infra::logging::log_setup::{LogSettings, DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL};
use serde_json::Value;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_CREDENTIALS_PATH: &str = "keys/service_account.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(
        "No Google service-account credentials configured. Set GOOGLE_SERVICE_ACCOUNT_JSON \
         or GOOGLE_SERVICE_ACCOUNT_FILE, or place the key at {0}"
    )]
    MissingCredentials(String),
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Where the service-account credential comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// The raw text of `GOOGLE_SERVICE_ACCOUNT_JSON`.
    Inline(String),
    File(PathBuf),
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Inline(text) => write!(f, "Inline({} chars)", text.len()),
            CredentialSource::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

impl CredentialSource {
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Inline(_) => "GOOGLE_SERVICE_ACCOUNT_JSON".to_string(),
            CredentialSource::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ChatSettings {
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub temperature: f32,
}

impl ChatSettings {
    pub fn ai_config(&self) -> AiConfig {
        AiConfig {
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("api_key", &"***masked***")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chat: ChatSettings,
    pub max_history: usize,
    pub credentials: Option<CredentialSource>,
    pub default_credentials_path: PathBuf,
    pub log: LogSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("ABACUS_API_KEY").ok_or(ConfigError::Missing("ABACUS_API_KEY"))?;

        let temperature = match get("GEMINI_TEMPERATURE") {
            Some(raw) => raw.parse::<f32>().map_err(|e| ConfigError::Invalid {
                key: "GEMINI_TEMPERATURE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        let max_history = match get("ASSISTANT_MAX_HISTORY") {
            Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::Invalid {
                key: "ASSISTANT_MAX_HISTORY",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_HISTORY,
        };

        let default_credentials_path = PathBuf::from(
            get("GOOGLE_SERVICE_ACCOUNT_DEFAULT_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string()),
        );

        // Inline JSON wins; a configured file only counts if it exists.
        let credentials = get("GOOGLE_SERVICE_ACCOUNT_JSON")
            .map(CredentialSource::Inline)
            .or_else(|| {
                get("GOOGLE_SERVICE_ACCOUNT_FILE")
                    .map(PathBuf::from)
                    .filter(|p| p.is_file())
                    .map(CredentialSource::File)
            })
            .or_else(|| {
                Some(default_credentials_path.clone())
                    .filter(|p| p.is_file())
                    .map(CredentialSource::File)
            });

        Ok(Self {
            chat: ChatSettings {
                api_key,
                url: get("ABACUS_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
                model: get("ABACUS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature,
            },
            max_history,
            credentials,
            default_credentials_path,
            log: LogSettings {
                level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                file: PathBuf::from(get("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())),
            },
        })
    }

    /// The credential as configured, before normalization. `None` when no
    /// source is configured.
    pub fn raw_credentials(&self) -> Result<Option<Value>, ConfigError> {
        match &self.credentials {
            None => Ok(None),
            Some(CredentialSource::Inline(text)) => Ok(Some(Value::String(text.clone()))),
            Some(CredentialSource::File(path)) => std::fs::read_to_string(path)
                .map(|text| Some(Value::String(text)))
                .map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                }),
        }
    }

    pub fn service_account_key(&self) -> Result<ServiceAccountKey, ConfigError> {
        let raw = self.raw_credentials()?.ok_or_else(|| {
            ConfigError::MissingCredentials(self.default_credentials_path.display().to_string())
        })?;
        let map = normalize(raw)?;
        Ok(ServiceAccountKey::from_map(&map)?)
    }
}
