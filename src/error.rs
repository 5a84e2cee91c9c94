use std::time::Duration;

/// Errors produced while loading data from the profiler API.
///
/// None of these are fatal to the dashboard: callers log them, keep whatever
/// was rendered before and show a transient banner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection refused, DNS failure, broken body and similar.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not finish within the configured timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The body was not in any of the accepted shapes.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl LoadError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Malformed bodies are handled exactly like transport failures.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Malformed(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), err.to_string());
        }
        Self::Network(err.to_string())
    }
}
