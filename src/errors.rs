//! Error types for the advisor engine
//!
//! One taxonomy for the whole turn pipeline. The recoverable variants
//! (classification parse, retrieval, tools, generation) are handled inside
//! the router and agents and never abort a turn; session store failures are
//! the only hard error a caller sees.

use thiserror::Error;

/// Main error type for the advisor engine
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Classifier output was not in the expected per-category form
    #[error("Classification output could not be parsed: {0}")]
    ClassificationParse(String),

    /// Vector search backend cannot be reached
    #[error("Retrieval backend unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Catalog lookup tool cannot be reached
    #[error("Lookup tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Generation backend did not answer within the deadline
    #[error("Generation timed out after {duration_ms}ms")]
    GenerationTimeout { duration_ms: u64 },

    /// Generation backend returned an error or unusable output
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// Session persistence errors
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Turn state machine guard
    #[error("Invalid turn transition from {from:?} to {to:?}: {reason}")]
    InvalidTurnTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Convert anyhow errors into the session-store bucket, the only place the
/// engine uses anyhow internally
impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        AdvisorError::SessionStore(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = AdvisorError::GenerationTimeout { duration_ms: 12000 };
        assert!(err.to_string().contains("12000"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = AdvisorError::InvalidTurnTransition {
            from: "Received".to_string(),
            to: "Persisted".to_string(),
            reason: "turn was never routed".to_string(),
        };
        assert!(err.to_string().contains("Received"));
        assert!(err.to_string().contains("Persisted"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = AdvisorError::ClassificationParse("no category lines".to_string());
        assert!(err.to_string().contains("no category lines"));
    }
}
