//! Error types for vRA API access and the resource workflow.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T, E = VraError> = std::result::Result<T, E>;

/// Errors raised while talking to the platform or interpreting its data.
#[derive(Debug, Error)]
pub enum VraError {
    /// Raised when a caller supplies a malformed combination of inputs.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Raised when a resource or an action on it does not exist.
    #[error("{what} not found for resource {id}")]
    NotFound {
        /// What was being looked up (`"resource"`, `"action 'Power On'"`).
        what: String,
        /// Resource identifier the lookup was made against.
        id: String,
    },

    /// Non-2xx response from the platform.
    #[error("API request to {url} failed with status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Sanitized, truncated response body.
        message: String,
    },

    /// Connection-level failure before a status was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A fetched descriptor is missing a field every well-formed one carries.
    #[error("malformed descriptor for resource {id}: {reason}")]
    MalformedDescriptor {
        /// Resource identifier, or `"<unknown>"` when the id itself is absent.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The platform answered 2xx but the response is unusable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Body could not be parsed as JSON.
    #[error("failed to parse response JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Base URL or path could not be joined into a valid URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A bounded poll gave up before the condition was met.
    #[error("timed out waiting for {what} after {attempts} attempt(s) ({elapsed:?})")]
    Timeout {
        /// Condition being waited on.
        what: String,
        /// Probes performed.
        attempts: u32,
        /// Wall time spent.
        elapsed: Duration,
    },
}

impl VraError {
    /// True when the platform answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// HTTP status code, if this error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found_only_for_404() {
        let not_found = VraError::Http {
            status: 404,
            url: "https://vra.example.com/x".to_string(),
            message: String::new(),
        };
        let forbidden = VraError::Http {
            status: 403,
            url: "https://vra.example.com/x".to_string(),
            message: String::new(),
        };

        assert!(not_found.is_not_found());
        assert!(!forbidden.is_not_found());
        assert_eq!(forbidden.status(), Some(403));
        assert!(!VraError::InvalidArgument("x".to_string()).is_not_found());
    }

    #[test]
    fn test_not_found_message_names_resource() {
        let err = VraError::NotFound {
            what: "action 'Destroy'".to_string(),
            id: "res-1".to_string(),
        };
        assert_eq!(err.to_string(), "action 'Destroy' not found for resource res-1");
    }
}
