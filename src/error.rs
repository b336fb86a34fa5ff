//! Harness error type.

/// Error type for harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The request body could not be assembled.
    #[error("request body: {0}")]
    Body(#[from] wire::BodyError),
    /// An HTTP request to the test server failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A header value could not be constructed.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// A header name could not be constructed.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
    /// The WebSocket handshake or transport failed.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    /// The WebSocket connection has ended.
    #[error("websocket closed")]
    WsClosed,
    /// No message arrived before the deadline. The connection stays usable.
    #[error("timed out waiting for message")]
    Timeout,
    /// A payload could not be encoded or decoded as JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// The adapter does not support this optional capability.
    #[error("{0} is not implemented by this client")]
    NotImplemented(&'static str),
    /// Binding or serving the test server failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for HarnessError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
