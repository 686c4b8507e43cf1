//! Error types for tubeqa.

use thiserror::Error;

/// Library-level error type for tubeqa operations.
#[derive(Error, Debug)]
pub enum TubeqaError {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Transcript for video {0} contains no text")]
    EmptyTranscript(String),

    #[error("No previously indexed video found")]
    NoPriorVideo,

    #[error("No video is loaded. Prepare a video before asking questions.")]
    NotReady,

    #[error("No saved index found for video {0}")]
    IndexNotFound(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Embedding generation failed: {message}")]
    Embedding { message: String, retryable: bool },

    #[error("Answer generation failed: {message}")]
    Generation { message: String, retryable: bool },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse error classes a front end can map to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidReference,
    TranscriptsDisabled,
    TranscriptUnavailable,
    NoPriorVideo,
    NotReady,
    IndexNotFound,
    IndexBuild,
    Generation,
    Other,
}

impl TubeqaError {
    /// Classify this error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TubeqaError::InvalidReference(_) => ErrorKind::InvalidReference,
            TubeqaError::TranscriptsDisabled(_) => ErrorKind::TranscriptsDisabled,
            TubeqaError::TranscriptUnavailable(_) | TubeqaError::EmptyTranscript(_) => {
                ErrorKind::TranscriptUnavailable
            }
            TubeqaError::NoPriorVideo => ErrorKind::NoPriorVideo,
            TubeqaError::NotReady => ErrorKind::NotReady,
            TubeqaError::IndexNotFound(_) => ErrorKind::IndexNotFound,
            TubeqaError::IndexBuild(_) | TubeqaError::Embedding { .. } => ErrorKind::IndexBuild,
            TubeqaError::Generation { .. } => ErrorKind::Generation,
            _ => ErrorKind::Other,
        }
    }

    /// Whether retrying the same call later may succeed.
    ///
    /// Only transient model-service failures qualify. Permanent conditions such as
    /// disabled transcripts or exhausted quota are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TubeqaError::Generation { retryable, .. } | TubeqaError::Embedding { retryable, .. } => {
                *retryable
            }
            _ => false,
        }
    }
}

/// Result type alias for tubeqa operations.
pub type Result<T> = std::result::Result<T, TubeqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TubeqaError::InvalidReference("x".into()).kind(),
            ErrorKind::InvalidReference
        );
        assert_eq!(
            TubeqaError::EmptyTranscript("abc12345678".into()).kind(),
            ErrorKind::TranscriptUnavailable
        );
        assert_eq!(TubeqaError::NotReady.kind(), ErrorKind::NotReady);
    }

    #[test]
    fn test_retryable() {
        let transient = TubeqaError::Generation {
            message: "rate limited".into(),
            retryable: true,
        };
        assert!(transient.is_retryable());

        let quota = TubeqaError::Generation {
            message: "insufficient_quota".into(),
            retryable: false,
        };
        assert!(!quota.is_retryable());
        assert!(!TubeqaError::TranscriptsDisabled("abc12345678".into()).is_retryable());
    }
}
