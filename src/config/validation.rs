use crate::config::types::{
    ApiConfig, CheckpointConfig, Config, CrawlerConfig, QuotaConfig, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_quota_config(&config.quota)?;
    validate_storage_config(&config.storage)?;
    validate_checkpoint_config(&config.checkpoint)?;
    validate_crawler_config(&config.crawler)?;
    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if !(10..=100).contains(&config.page_size) {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 10 and 100, got {}",
            config.page_size
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "key-env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates quota configuration
fn validate_quota_config(config: &QuotaConfig) -> Result<(), ConfigError> {
    if config.daily_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "daily-limit must be >= 1, got {}",
            config.daily_limit
        )));
    }
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.reconnect_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "reconnect-attempts must be >= 1, got {}",
            config.reconnect_attempts
        )));
    }

    Ok(())
}

/// Validates checkpoint configuration
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates key-space selection
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    config.consonant_set()?;

    if config.max_keys == Some(0) {
        return Err(ConfigError::Validation(
            "max-keys must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}
