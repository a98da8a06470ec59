use std::path::Path;

use crate::errors::HookscanError;

use super::credentials::resolve_credential;
use super::types::ServiceConfig;

pub async fn parse_config(path: &Path) -> Result<ServiceConfig, HookscanError> {
    if !path.exists() {
        return Err(HookscanError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(HookscanError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let mut config: ServiceConfig = serde_yaml::from_str(&content)?;

    config.webhook_secret = resolve_credential(&config.webhook_secret)?;
    config.github.token = resolve_credential(&config.github.token)?;

    validate(&config)?;

    Ok(config)
}

/// Semantic validation beyond what serde enforces structurally.
fn validate(config: &ServiceConfig) -> Result<(), HookscanError> {
    if config.webhook_secret.is_empty() {
        return Err(HookscanError::Config("webhook_secret must not be empty".into()));
    }
    if config.limits.max_concurrent_scans == 0 {
        return Err(HookscanError::Config("limits.max_concurrent_scans must be at least 1".into()));
    }
    if config.limits.request_timeout_secs == 0 {
        return Err(HookscanError::Config("limits.request_timeout_secs must be at least 1".into()));
    }
    if config.limits.max_archive_bytes == 0 {
        return Err(HookscanError::Config("limits.max_archive_bytes must be at least 1".into()));
    }
    if config.limits.max_archive_bytes > config.limits.workspace_quota_bytes {
        return Err(HookscanError::Config(format!(
            "limits.max_archive_bytes ({}) exceeds limits.workspace_quota_bytes ({}); no scan could ever be admitted",
            config.limits.max_archive_bytes, config.limits.workspace_quota_bytes
        )));
    }
    Ok(())
}
