use thiserror::Error;

use serde::Deserialize;

/// Error payload returned by the platform API
///
/// Most endpoints return this shape on 4xx responses; fields are optional
/// because error bodies are not consistent across services.
#[derive(Debug, Clone, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("API error body: message={message:?}, code={code:?}")]
pub struct ApiErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub context_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorBody>>,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed")]
    Auth,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// HTTP status associated with this error, when one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Auth => Some(401),
            ApiError::RateLimited => Some(429),
            _ => None,
        }
    }

    /// Read-after-write propagation and delete confirmation both key off 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Outcome of a lookup-by-name scan over a listing endpoint
///
/// An empty listing and a listing without the wanted name are distinct
/// outcomes, but both keep the caller polling; only transport/API failures
/// abort the search.
#[derive(Debug, Error)]
pub enum NameLookupError {
    #[error("no entries returned yet while searching for '{name}'")]
    NotYetVisible { name: String },

    #[error("no match found for name '{name}'")]
    NotFound { name: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl NameLookupError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NameLookupError::Api(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = ApiError::Api {
            status: 404,
            message: "not found".to_string(),
            details: None,
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());

        assert_eq!(ApiError::Auth.status(), Some(401));
        assert_eq!(ApiError::RateLimited.status(), Some(429));
        assert_eq!(ApiError::Parse("bad".to_string()).status(), None);
    }

    #[test]
    fn lookup_outcomes_split_retryable() {
        assert!(NameLookupError::NotYetVisible {
            name: "a".to_string()
        }
        .is_retryable());
        assert!(NameLookupError::NotFound {
            name: "a".to_string()
        }
        .is_retryable());
        assert!(!NameLookupError::Api(ApiError::ServiceUnavailable).is_retryable());
    }
}
