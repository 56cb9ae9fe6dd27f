//! Error types for the provider client.

/// Errors that can occur when querying a stats provider.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unreadable body).
    #[error("Request failed")]
    RequestFailed,
    /// The provider returned an error status, either as the HTTP status or
    /// embedded in an otherwise successful payload.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// A successful response whose body is not valid JSON.
    #[error("Provider returned a body that is not JSON")]
    InvalidJson,
    /// The provider answered with an empty JSON object.
    #[error("Provider returned an empty JSON object")]
    EmptyPayload,
    /// The provider answered with JSON that is not an object.
    #[error("Provider returned non-object JSON ({0})")]
    UnexpectedShape(&'static str),
}

impl Error {
    /// HTTP-equivalent status for this error, if any.
    ///
    /// An empty payload maps to 502 so callers can treat it like a bad gateway.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::EmptyPayload => Some(502),
            _ => None,
        }
    }
}
