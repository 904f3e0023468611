//! Error types for the guardml crate

use thiserror::Error;

/// Result type alias for guardml operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Main error type for the guardml crate
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("empty training data")]
    EmptyData,

    #[error("model not trained")]
    NotTrained,

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("stream cancelled")]
    Cancelled,

    #[error("data error: {0}")]
    Data(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(GuardError::NotTrained.to_string(), "model not trained");
        assert_eq!(GuardError::EmptyData.to_string(), "empty training data");
        assert_eq!(
            GuardError::Data("bad column".to_string()).to_string(),
            "data error: bad column"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GuardError = io_err.into();
        assert!(matches!(err, GuardError::Io(_)));
    }
}
