use crate::hangul::Consonant;
use crate::retry::RetryPolicy;
use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Default search endpoint of the open dictionary
pub const DEFAULT_ENDPOINT: &str = "https://opendict.korean.go.kr/api/search";

/// Environment variable consulted when no key is written in the config
pub const DEFAULT_KEY_ENV: &str = "OPENDICT_ACCESS_KEY";

/// Main configuration structure for Hangul-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

/// Dictionary search API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Search endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Access key written directly in the config (takes precedence over `key-env`)
    #[serde(default)]
    pub key: Option<String>,

    /// Environment variable holding the access key
    #[serde(rename = "key-env", default = "default_key_env")]
    pub key_env: String,

    /// Results requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff step between retries (seconds)
    #[serde(rename = "backoff-step-secs", default = "default_backoff_step_secs")]
    pub backoff_step_secs: u64,

    /// Pause after every request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// User-Agent header override
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// Daily request budget
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Requests allowed per local calendar day
    #[serde(rename = "daily-limit", default = "default_daily_limit")]
    pub daily_limit: u32,
}

/// Dictionary database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Insert attempts before a word is given up on
    #[serde(rename = "reconnect-attempts", default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Pause between insert attempts (milliseconds)
    #[serde(rename = "reconnect-delay-ms", default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// Checkpoint file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    /// Path to the JSON checkpoint
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
}

/// Key-space selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerConfig {
    /// Initial consonants to crawl, as compatibility jamo (empty means all 19)
    #[serde(default)]
    pub consonants: Vec<String>,

    /// Stop cleanly after this many keys in one run
    #[serde(rename = "max-keys", default)]
    pub max_keys: Option<u64>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_key_env() -> String {
    DEFAULT_KEY_ENV.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_step_secs() -> u64 {
    5
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_daily_limit() -> u32 {
    1000
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_checkpoint_path() -> String {
    "./progress.json".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            key: None,
            key_env: default_key_env(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_step_secs: default_backoff_step_secs(),
            request_delay_ms: default_request_delay_ms(),
            user_agent: None,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

impl ApiConfig {
    /// Resolves the access key from the config or the environment
    ///
    /// Only a crawl needs the key, so this is not part of validation.
    pub fn resolve_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        match std::env::var(&self.key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingCredential(format!(
                "set api.key or the {} environment variable",
                self.key_env
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Linear backoff for transient network failures
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_retries, Duration::from_secs(self.backoff_step_secs))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("hangul-harvest/{}", env!("CARGO_PKG_VERSION")))
    }
}

impl StorageConfig {
    /// Fixed-delay reconnect policy for transient storage failures
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.reconnect_attempts,
            Duration::from_millis(self.reconnect_delay_ms),
        )
    }
}

impl CrawlerConfig {
    /// Parses the configured consonants
    ///
    /// Returns all 19 in composition order when none are configured.
    pub fn consonant_set(&self) -> Result<Vec<Consonant>, ConfigError> {
        if self.consonants.is_empty() {
            return Ok(Consonant::ALL.to_vec());
        }

        let mut selected = Vec::with_capacity(self.consonants.len());
        for entry in &self.consonants {
            let mut chars = entry.trim().chars();
            let consonant = match (chars.next(), chars.next()) {
                (Some(jamo), None) => Consonant::from_jamo(jamo),
                _ => None,
            }
            .ok_or_else(|| ConfigError::InvalidConsonant(entry.clone()))?;

            if !selected.contains(&consonant) {
                selected.push(consonant);
            }
        }
        selected.sort_by_key(|c| c.index());
        Ok(selected)
    }
}
