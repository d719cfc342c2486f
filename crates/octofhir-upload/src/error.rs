use thiserror::Error;

/// Errors that stop an upload run or a library operation.
///
/// Per-resource failures (validation errors, transport failures on a single
/// attempt, exhausted retries) are not errors: they end up as outcomes in the
/// run summary. Only conditions that make the whole run meaningless surface
/// here.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("FHIR server at {endpoint} is unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl UploadError {
    /// Create a new Unreachable error
    pub fn unreachable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors detected before any resource was submitted.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::InvalidEndpoint(_) | Self::Configuration(_)
        )
    }
}

/// Errors raised while persisting patch artifacts.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid patch source path: {0}")]
    InvalidPath(String),

    #[error("No patch sequence numbers left for {0}")]
    SequenceExhausted(String),
}

impl From<tempfile::PersistError> for PatchError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Persist {
            path: err.file.path().display().to_string(),
            source: err.error,
        }
    }
}

/// Errors raised by the id rewriting helpers.
#[derive(Debug, Error)]
pub enum IdRewriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Suffix \"{0}\" leaves no room for an id within 64 characters")]
    SuffixTooLong(String),

    #[error("Not a JSON object: {0}")]
    NotAnObject(String),
}

/// Convenience result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_error() {
        let err = UploadError::unreachable("http://localhost:8080/fhir", "connection refused");
        assert_eq!(
            err.to_string(),
            "FHIR server at http://localhost:8080/fhir is unreachable: connection refused"
        );
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_io_error_is_not_configuration() {
        let err: UploadError = std::io::Error::other("disk full").into();
        assert!(!err.is_configuration_error());
        assert_eq!(err.to_string(), "IO error: disk full");
    }

    #[test]
    fn test_suffix_too_long_message() {
        let err = IdRewriteError::SuffixTooLong("x".repeat(70));
        assert!(err.to_string().contains("64 characters"));
    }
}
