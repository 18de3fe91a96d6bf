//! Completion service error types

use std::time::Duration;
use thiserror::Error;

/// Failures of a completion call
///
/// The bot only distinguishes "the service said something unusable" from
/// "the service could not be reached"; see [`LlmError::is_malformed`].
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Client misconfigured: {0}")]
    Config(String),

    #[error("Rate limited by the completion service, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Completion service returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No completion after {0:?}")]
    Timeout(Duration),

    #[error("Completion withheld by the content filter")]
    Blocked,

    #[error("Unusable completion: {0}")]
    InvalidResponse(String),

    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// The service answered, but the answer cannot be used
    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::InvalidResponse(_) | LlmError::Json(_) | LlmError::Blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_malformed() {
        assert!(LlmError::InvalidResponse("Empty completion".to_string()).is_malformed());
        assert!(LlmError::Blocked.is_malformed());

        assert!(
            !LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_malformed()
        );
        assert!(!LlmError::Timeout(Duration::from_secs(30)).is_malformed());
        assert!(!LlmError::Config("missing key".to_string()).is_malformed());
    }

    #[test]
    fn test_display_is_user_readable() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "Rate limited by the completion service, retry after 60s"
        );
    }
}
