//! WebSocket client contract and message value object.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::HarnessError;

/// Kind of a received WebSocket frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
    Ping,
    Pong,
    Close,
}

/// One received frame.
///
/// For [`MessageKind::Close`], `data` holds the close reason and `extra` the
/// close code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub data: Vec<u8>,
    pub extra: Option<String>,
}

impl Message {
    #[must_use]
    pub fn new(kind: MessageKind, data: impl Into<Vec<u8>>) -> Self {
        Self { kind, data: data.into(), extra: None }
    }

    #[must_use]
    pub fn close(code: u16, reason: &str) -> Self {
        Self {
            kind: MessageKind::Close,
            data: reason.as_bytes().to_vec(),
            extra: Some(code.to_string()),
        }
    }

    /// Payload decoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the payload is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}

/// Uniform operations over one WebSocket connection.
#[async_trait]
pub trait WebSocketClient: Send {
    fn name(&self) -> &str {
        ""
    }

    /// Send a text frame. Resolves once the transport accepted it.
    async fn send_json(&mut self, payload: &Value) -> Result<(), HarnessError>;

    async fn send_bytes(&mut self, payload: &[u8]) -> Result<(), HarnessError>;

    /// Wait for the next frame. `None` waits indefinitely.
    ///
    /// A timeout returns [`HarnessError::Timeout`] and leaves the connection
    /// usable; an ended connection returns [`HarnessError::WsClosed`].
    async fn receive(&mut self, timeout: Option<Duration>) -> Result<Message, HarnessError>;

    async fn receive_json(&mut self, timeout: Option<Duration>) -> Result<Value, HarnessError> {
        let message = self.receive(timeout).await?;
        Ok(message.json()?)
    }

    /// Close the connection and wait for the teardown to finish.
    async fn close(&mut self) -> Result<(), HarnessError>;

    fn closed(&self) -> bool;

    fn close_code(&self) -> Option<u16>;

    fn close_reason(&self) -> Option<&str>;

    /// Test assertion on the close reason.
    ///
    /// # Panics
    ///
    /// Panics when the reason differs from `reason`.
    fn assert_reason(&self, reason: &str) {
        assert_eq!(self.close_reason(), Some(reason), "unexpected websocket close reason");
    }
}

/// Messages from `client` until it reports closed.
///
/// The stream is lazy and not restartable: calling this again continues from
/// the connection's current state.
pub fn messages<C>(client: &mut C) -> BoxStream<'_, Result<Message, HarnessError>>
where
    C: WebSocketClient + ?Sized,
{
    futures::stream::unfold(client, |client| async move {
        if client.closed() {
            return None;
        }
        let next = client.receive(None).await;
        Some((next, client))
    })
    .boxed()
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
