//! Provider error types.

use thiserror::Error;

/// Errors raised by generator and retriever backends.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model or index was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend answered with a body we could not use.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Errors that will not go away by trying again with the same settings.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::NotFound(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::NetworkError(err.to_string())
        }
    }

    /// Map a non-success HTTP response onto the taxonomy.
    pub(crate) async fn from_response(response: reqwest::Response, what: &str) -> Self {
        let status = response.status().as_u16();
        match status {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5)
                    * 1000;
                ProviderError::RateLimited {
                    retry_after_ms: retry_after,
                }
            }
            401 | 403 => {
                ProviderError::AuthenticationFailed(response.text().await.unwrap_or_default())
            }
            404 => ProviderError::NotFound(what.to_string()),
            _ => ProviderError::ApiError {
                status,
                message: response.text().await.unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanence() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(ProviderError::NotFound("gpt-9".into()).is_permanent());
        assert!(!ProviderError::RateLimited { retry_after_ms: 1000 }.is_permanent());
        assert!(!ProviderError::Timeout(60).is_permanent());
    }

    #[test]
    fn messages() {
        let err = ProviderError::ApiError {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 503): overloaded");
    }
}
