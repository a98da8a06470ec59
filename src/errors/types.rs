use thiserror::Error;

/// Every failure the pipeline can surface. Each variant maps to one HTTP
/// status and one stable `error_kind` string in the API layer.
#[derive(Debug, Error)]
pub enum HookscanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Provider rejected our credential: {0}")]
    RemoteAuth(String),

    #[error("Archive exceeds transfer limit: {0}")]
    FetchTooLarge(String),

    #[error("Unsafe archive entry: {0}")]
    UnsafeArchiveEntry(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Scan timed out: {0}")]
    ScanTimeout(String),

    #[error("Request deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Scanner failed: {0}")]
    ScanExecution(String),

    #[error("Workspace quota exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Timed out waiting for a scan slot: {0}")]
    QueueTimeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HookscanError {
    /// Stable machine-readable kind, used in error response bodies so that
    /// webhook senders can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::SignatureRejected(_) => "signature_rejected",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::RepositoryNotFound(_) => "repository_not_found",
            Self::RemoteAuth(_) => "remote_auth",
            Self::FetchTooLarge(_) => "fetch_too_large",
            Self::UnsafeArchiveEntry(_) => "unsafe_archive_entry",
            Self::Fetch(_) => "fetch",
            Self::ScanTimeout(_) => "scan_timeout",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::ScanExecution(_) => "scan_execution",
            Self::ResourceExhausted(_) => "resource_exhausted",
            Self::QueueTimeout(_) => "queue_timeout",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_snake_case() {
        let errors = [
            HookscanError::SignatureRejected("x".into()),
            HookscanError::MalformedPayload("x".into()),
            HookscanError::RepositoryNotFound("x".into()),
            HookscanError::RemoteAuth("x".into()),
            HookscanError::FetchTooLarge("x".into()),
            HookscanError::UnsafeArchiveEntry("x".into()),
            HookscanError::ScanTimeout("x".into()),
            HookscanError::ScanExecution("x".into()),
            HookscanError::ResourceExhausted("x".into()),
            HookscanError::QueueTimeout("x".into()),
        ];
        for e in &errors {
            let kind = e.kind();
            assert!(!kind.is_empty());
            assert!(kind.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HookscanError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
