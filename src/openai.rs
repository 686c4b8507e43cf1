//! OpenAI client configuration and error classification.

use crate::error::{Result, TubeqaError};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Split an OpenAI failure into a message and whether it is worth retrying.
///
/// Timeouts, connection failures, rate limiting and server errors are transient.
/// Authentication, quota and malformed-request errors are permanent.
pub fn classify_error(err: &OpenAIError) -> (String, bool) {
    let retryable = match err {
        OpenAIError::Reqwest(e) => {
            e.is_timeout()
                || e.is_connect()
                || e
                    .status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = api.message.to_lowercase();
            if kind == "insufficient_quota" || message.contains("quota") {
                false
            } else {
                kind == "server_error" || message.contains("rate limit") || message.contains("overloaded")
            }
        }
        OpenAIError::StreamError(_) => true,
        _ => false,
    };

    (err.to_string(), retryable)
}

/// Convert an OpenAI failure during answer generation.
pub fn generation_error(err: OpenAIError) -> TubeqaError {
    let (message, retryable) = classify_error(&err);
    TubeqaError::Generation { message, retryable }
}

/// Convert an OpenAI failure during embedding.
pub fn embedding_error(err: OpenAIError) -> TubeqaError {
    let (message, retryable) = classify_error(&err);
    TubeqaError::Embedding { message, retryable }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_is_permanent() {
        let (message, retryable) =
            classify_error(&OpenAIError::InvalidArgument("bad model".to_string()));
        assert!(message.contains("bad model"));
        assert!(!retryable);
    }

    #[test]
    fn test_stream_error_is_transient() {
        let err = generation_error(OpenAIError::StreamError("connection reset".to_string()));
        assert!(err.is_retryable());
    }
}
