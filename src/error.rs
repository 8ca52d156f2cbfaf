use thiserror::Error;

/// Failure while building pipeline components from configuration.
#[derive(Error, Debug)]
pub enum TrendLensError {
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TrendLensError>;

/// Failure of a single outbound request, or of a retried sequence of them.
///
/// This is the only error a pipeline run can surface to its caller.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Rate limited by {url} (status {status})")]
    RateLimited { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{label} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn decode(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Transient failures worth another attempt: connection problems,
    /// timeouts, server-side errors and 429 responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::RateLimited { .. }
            | Self::Decode { .. }
            | Self::RetriesExhausted { .. }
            | Self::Cancelled => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_rate_limited(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com".to_string(),
            status: code,
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(502).is_retryable());
        assert!(status(503).is_retryable());
    }

    #[test]
    fn test_too_many_requests_is_retryable() {
        assert!(status(429).is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(410).is_retryable());
    }

    #[test]
    fn test_rate_limited_is_not_retryable() {
        let err = FetchError::RateLimited {
            url: "https://api.example.com/repos/a/b".to_string(),
            status: 403,
        };
        assert!(!err.is_retryable());
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = FetchError::RetriesExhausted {
            label: "listing".to_string(),
            attempts: 3,
            last: Box::new(status(503)),
        };
        assert!(!err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("503"));
    }
}
