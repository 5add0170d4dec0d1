use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::DEFAULT_LIST_LIMIT;
use crate::validation::YearPolicy;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub validation: YearPolicy,
    #[serde(default)]
    pub notices: NoticeConfig,
    #[serde(default)]
    pub list: ListConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the movie service (e.g. "http://localhost:8000/api/v1").
    /// Empty means unset, which is fatal at startup.
    #[serde(default)]
    pub url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Optional scheme put in front of the token in the Authorization
    /// header (e.g. "Bearer"). The raw token is sent when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout(),
            auth_scheme: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Durable client storage (holds the auth token)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("movieshelf.db")
}

/// Banner notices
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoticeConfig {
    /// How long a notice stays visible before it is dismissed automatically.
    #[serde(default = "default_auto_dismiss_ms")]
    pub auto_dismiss_ms: u64,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            auto_dismiss_ms: default_auto_dismiss_ms(),
        }
    }
}

fn default_auto_dismiss_ms() -> u64 {
    6000
}

/// List query defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListConfig {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

/// Sanitized config for display (auth details reduced to flags)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: SanitizedApiConfig,
    pub storage: StorageConfig,
    pub validation: YearPolicy,
    pub notices: NoticeConfig,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub auth_scheme: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: SanitizedApiConfig {
                url: config.api.url.clone(),
                timeout_secs: config.api.timeout_secs,
                auth_scheme: config
                    .api
                    .auth_scheme
                    .clone()
                    .unwrap_or_else(|| "raw".to_string()),
            },
            storage: config.storage.clone(),
            validation: config.validation.clone(),
            notices: config.notices.clone(),
            list: config.list.clone(),
        }
    }
}
