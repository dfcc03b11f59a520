//! Error types for netpulse-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool id not present in the catalog
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Collaborator answered with a non-success HTTP status
    #[error("http {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Sanitized response body
        message: String,
    },

    /// Network error (connect, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Collaborator answered with a body we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether the failure is retry-eligible (network/timeout class).
    ///
    /// Gateway-style HTTP statuses count as transient; every other status,
    /// and every input or decoding problem, is fatal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => matches!(status, 502..=504),
            Self::NotFound(_) | Self::InvalidInput(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Network("reset".into()).is_transient());
        assert!(Error::Timeout(5000).is_transient());
        assert!(Error::Http {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());

        assert!(!Error::Http {
            status: 404,
            message: "no such session".into()
        }
        .is_transient());
        assert!(!Error::InvalidResponse("bad json".into()).is_transient());
        assert!(!Error::NotFound("teleport".into()).is_transient());
    }

    #[test]
    fn test_only_gateway_statuses_are_transient() {
        let http = |status| Error::Http {
            status,
            message: String::new(),
        };
        for status in [502, 503, 504] {
            assert!(http(status).is_transient(), "{status} should be retried");
        }
        for status in [400, 429, 500, 501, 505] {
            assert!(!http(status).is_transient(), "{status} should be fatal");
        }
    }
}
