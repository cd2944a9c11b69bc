//! APOD client error types.

use apodcal_core::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApodError {
    #[error("API key rejected ({0})")]
    InvalidApiKey(u16),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("No entry published: {0}")]
    NotFound(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("API error: {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ApodError {
    /// User-friendly error message for display in the calendar.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidApiKey(_) => {
                "Failed to load APOD data: the NASA API key was rejected.".to_string()
            }
            Self::RateLimited(secs) => format!(
                "Failed to load APOD data: too many requests, try again in {} seconds.",
                secs
            ),
            Self::NotFound(_) => "No APOD entry was published for that date.".to_string(),
            Self::InvalidRange(_) => "Failed to load APOD data: invalid date range.".to_string(),
            Self::Api { status, .. } if *status >= 500 => {
                "Failed to load APOD data: the NASA service is having trouble.".to_string()
            }
            Self::Api { .. } | Self::InvalidResponse(_) => {
                "Failed to load APOD data.".to_string()
            }
            Self::Network(e) => format!("Failed to load APOD data. {}", e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = ApodError::RateLimited(30);
        assert!(err.user_message().contains("30"));

        let err = ApodError::InvalidApiKey(403);
        assert!(err.user_message().contains("API key"));

        let err = ApodError::Network(NetworkError::Timeout);
        assert!(err.user_message().starts_with("Failed to load APOD data."));
    }

    #[test]
    fn test_messages_never_empty() {
        let errors = [
            ApodError::InvalidApiKey(401),
            ApodError::RateLimited(1),
            ApodError::NotFound("2024-03-05".into()),
            ApodError::InvalidRange("x".into()),
            ApodError::Api {
                status: 400,
                message: "bad".into(),
            },
            ApodError::InvalidResponse("eof".into()),
            ApodError::Network(NetworkError::ConnectionFailed("refused".into())),
        ];
        for err in errors {
            assert!(!err.user_message().is_empty(), "{err:?}");
        }
    }
}
