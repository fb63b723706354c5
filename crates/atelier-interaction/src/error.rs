//! Transport error types.

use atelier_core::AtelierError;
use serde::Deserialize;
use thiserror::Error;

/// A failure while talking to the model endpoint.
///
/// The `Display` output is what gets surfaced to the user, so the HTTP
/// variant carries the server's error message verbatim.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Non-2xx response from the endpoint.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Connection, timeout, or stream-read failure.
    #[error("{0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("{0}")]
    Decode(String),
}

/// Error body shape returned by the endpoint on non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl TransportError {
    /// Builds an HTTP error from a non-2xx response body.
    ///
    /// The body is expected to be `{"error": string}`; the message is
    /// surfaced verbatim. Anything else falls back to the raw body.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| body.to_string());
        Self::Http { status, message }
    }
}

impl From<TransportError> for AtelierError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
