//! Error types for the library layer.

use std::fmt;
use std::time::Duration;

/// Failures writing or reading a durable JSON file.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a value-producing operation run through the single-flight cache.
#[derive(thiserror::Error, Debug)]
pub enum ProduceError<E> {
    /// The producer did not finish within the allotted time.
    #[error("producer timed out after {0:?}")]
    Timeout(Duration),
    /// The producer itself failed.
    #[error(transparent)]
    Producer(E),
}

/// Errors produced by the library layer, wrapping provider errors
/// and adding timeout, credential, persistence, and input failures.
#[derive(Debug)]
pub enum StatBotError {
    /// An error from the underlying provider client.
    Api(statbot_api::Error),
    /// The provider did not answer within the configured producer timeout.
    Timeout(Duration),
    /// A required API key is not configured.
    MissingCredential(&'static str),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// A durable store could not be written.
    Persistence(CacheError),
}

impl fmt::Display for StatBotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Timeout(d) => write!(f, "Provider timed out after {}s", d.as_secs_f64()),
            Self::MissingCredential(name) => write!(f, "{} is not configured", name),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Persistence(e) => write!(f, "Persistence error: {}", e),
        }
    }
}

impl std::error::Error for StatBotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<statbot_api::Error> for StatBotError {
    fn from(e: statbot_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<CacheError> for StatBotError {
    fn from(e: CacheError) -> Self {
        Self::Persistence(e)
    }
}

impl From<ProduceError<StatBotError>> for StatBotError {
    fn from(e: ProduceError<StatBotError>) -> Self {
        match e {
            ProduceError::Timeout(d) => Self::Timeout(d),
            ProduceError::Producer(inner) => inner,
        }
    }
}
