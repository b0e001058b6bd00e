//! Error types for studio-drive.

use thiserror::Error;

/// Common error type for studio-drive.
#[derive(Error, Debug)]
pub enum StudioError {
    /// Missing or invalid input (required field, MIME type, category).
    #[error("validation error: {0}")]
    Validation(String),

    /// A size or rate ceiling was exceeded.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Failure reported by the remote storage provider.
    ///
    /// The message is the raw provider text and is only surfaced to callers
    /// as an optional diagnostic string.
    #[error("provider error: {0}")]
    Provider(String),

    /// Network failure or abort observed by the client side.
    #[error("transport error: {0}")]
    Transport(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StudioError {
    /// The raw message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            StudioError::Validation(msg)
            | StudioError::Quota(msg)
            | StudioError::Provider(msg)
            | StudioError::Transport(msg)
            | StudioError::Config(msg) => msg.clone(),
            StudioError::NotFound(what) => format!("{what} not found"),
            StudioError::Io(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::Transport(e.to_string())
    }
}

/// Result type alias for studio-drive operations.
pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = StudioError::Validation("Folder ID is required".to_string());
        assert_eq!(err.to_string(), "validation error: Folder ID is required");
        assert_eq!(err.message(), "Folder ID is required");
    }

    #[test]
    fn test_provider_error_display() {
        let err = StudioError::Provider("File not found: abc".to_string());
        assert_eq!(err.to_string(), "provider error: File not found: abc");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = StudioError::NotFound("project".to_string());
        assert_eq!(err.to_string(), "project not found");
        assert_eq!(err.message(), "project not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StudioError = io_err.into();
        assert!(matches!(err, StudioError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(StudioError::Quota("too many".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
