//! Error types for netpulse-llm
//!
//! Every failure here is absorbed by a fallback in the diagnosis core; the
//! variants exist so logs say which kind of failure it was.

use thiserror::Error;

/// Language-model error
#[derive(Debug, Error)]
pub enum Error {
    /// Backend missing configuration (API key, endpoint)
    #[error("model backend not configured: {0}")]
    NotConfigured(String),

    /// Backend could not be reached
    #[error("model backend unreachable: {0}")]
    Unavailable(String),

    /// Backend answered with an error status
    #[error("model backend rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status, 0 when the backend gave none
        status: u16,
        /// Sanitized backend message
        message: String,
    },

    /// Backend asked us to slow down
    #[error("model backend rate limited the request")]
    RateLimited,

    /// Reply arrived but carried no usable text
    #[error("model reply unusable: {0}")]
    EmptyReply(String),

    /// No reply within the deadline
    #[error("model did not answer within {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Classify an HTTP error status
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            _ => Self::Rejected {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether asking again later could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::RateLimited | Self::Timeout(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::NotConfigured(_) | Self::EmptyReply(_) => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(Error::from_status(429, "slow down"), Error::RateLimited));
        assert!(Error::from_status(503, "overloaded").is_transient());
        assert!(!Error::from_status(401, "bad key").is_transient());
        assert!(!Error::NotConfigured("OPENAI_API_KEY".into()).is_transient());
    }
}
