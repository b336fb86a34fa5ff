//! GraphQL-over-WebSocket sub-protocol handlers.
//!
//! DESIGN
//! ======
//! One connection loop, two handlers. The loop owns the socket and
//! `select!`s between inbound frames and an outbound channel that operation
//! tasks and timers write into. A [`ProtocolHandler`] turns inbound text into
//! engine calls and replies; it never touches the socket directly.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade picks a [`Protocol`] and registers [`ConnectionDiagnostics`]
//! 2. Handler is constructed, the connection hook sees its diagnostics
//! 3. Frames flow until either side closes
//! 4. Every tracked task is cancelled and joined, then `wait_closed` resolves

pub mod diagnostics;
mod graphql_ws;
mod transport_ws;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub use diagnostics::{ConnectionDiagnostics, ConnectionHandle, TaskSnapshot};

use crate::config::ConnectionHook;
use crate::context::{RequestContext, inject_shared_context};
use crate::engine::Engine;

// =============================================================================
// PROTOCOL SELECTION
// =============================================================================

/// Supported GraphQL WebSocket sub-protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// `graphql-transport-ws`: multiplexed operations with an init timeout.
    GraphQLTransportWs,
    /// `graphql-ws`: the legacy subscriptions-transport-ws framing.
    GraphQLWs,
}

impl Protocol {
    /// Server preference order.
    pub const SUPPORTED: [Self; 2] = [Self::GraphQLTransportWs, Self::GraphQLWs];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GraphQLTransportWs => "graphql-transport-ws",
            Self::GraphQLWs => "graphql-ws",
        }
    }

    /// Pick the preferred supported protocol among those a client offered.
    pub fn select<'a>(offered: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let offered: Vec<&str> = offered.into_iter().map(str::trim).collect();
        Self::SUPPORTED
            .into_iter()
            .find(|protocol| offered.contains(&protocol.as_str()))
    }
}

// =============================================================================
// SESSION
// =============================================================================

pub(crate) enum Outbound {
    Text(String),
    Close(u16, String),
}

/// What the connection loop should do after a handler callback.
pub(crate) enum Control {
    Continue,
    Close(u16, String),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionOptions {
    pub connection_init_wait: Duration,
    pub keep_alive: Option<Duration>,
}

/// Frame builders for operation results, per protocol.
#[derive(Clone, Copy)]
pub(crate) struct OperationFrames {
    pub result: fn(&str, &async_graphql::Response) -> Value,
    pub error: fn(&str, &async_graphql::Response) -> Value,
}

/// State shared by both handlers.
pub(crate) struct Session {
    engine: Engine,
    diagnostics: Arc<ConnectionDiagnostics>,
    outbound: mpsc::UnboundedSender<Outbound>,
    options: SessionOptions,
    connection_params: Option<Value>,
}

impl Session {
    pub fn send(&self, frame: &Value) {
        let _ = self.outbound.send(Outbound::Text(frame.to_string()));
    }

    /// Attach the per-operation context: base WebSocket context, shared test
    /// fixtures, and this connection's diagnostics.
    fn prepare(&self, request: async_graphql::Request) -> async_graphql::Request {
        let handle = self.diagnostics.handle();
        let mut context = RequestContext::new()
            .with("transport", "websocket")
            .with("protocol", handle.protocol.as_str())
            .with("connection_id", handle.id.to_string());
        if let Some(params) = &self.connection_params {
            context.insert("connection_params", params.clone());
        }

        request
            .data(inject_shared_context(context))
            .data(Arc::clone(&self.diagnostics))
            .data(handle)
    }

    /// Run an operation as a tracked task that streams frames until the
    /// engine's stream ends, then sends `complete`.
    pub fn spawn_operation(&self, id: String, request: async_graphql::Request, frames: OperationFrames) {
        let mut stream = self.engine.execute_stream(self.prepare(request));
        let outbound = self.outbound.clone();
        let op_id = id.clone();

        self.diagnostics.spawn_operation(id, async move {
            while let Some(response) = stream.next().await {
                let rejected = response.is_err() && response.data == async_graphql::Value::Null;
                let frame = if rejected {
                    (frames.error)(&op_id, &response)
                } else {
                    (frames.result)(&op_id, &response)
                };
                if outbound.send(Outbound::Text(frame.to_string())).is_err() || rejected {
                    return;
                }
            }
            let complete = serde_json::json!({"type": "complete", "id": op_id});
            let _ = outbound.send(Outbound::Text(complete.to_string()));
        });
    }
}

/// One sub-protocol's message handling.
pub(crate) trait ProtocolHandler: Send {
    /// Called once before the first frame is read.
    fn on_open(&mut self) {}

    fn on_text(&mut self, text: &str) -> Control;

    fn on_non_text(&mut self) -> Control;
}

// =============================================================================
// CONNECTION
// =============================================================================

pub(crate) async fn run(
    socket: WebSocket,
    engine: Engine,
    options: SessionOptions,
    diagnostics: Arc<ConnectionDiagnostics>,
    hook: Option<ConnectionHook>,
) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let session = Session {
        engine,
        diagnostics: Arc::clone(&diagnostics),
        outbound: outbound_tx,
        options,
        connection_params: None,
    };
    let handle = diagnostics.handle();
    info!(connection_id = %handle.id, protocol = handle.protocol.as_str(), "ws: client connected");

    match handle.protocol {
        Protocol::GraphQLTransportWs => {
            let handler = transport_ws::TransportWsHandler::new(session);
            serve(socket, outbound_rx, handler, &diagnostics, hook).await;
        }
        Protocol::GraphQLWs => {
            let handler = graphql_ws::GraphQLWsHandler::new(session);
            serve(socket, outbound_rx, handler, &diagnostics, hook).await;
        }
    }

    diagnostics.shutdown().await;
    info!(connection_id = %handle.id, "ws: client disconnected");
}

async fn serve<H: ProtocolHandler>(
    mut socket: WebSocket,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut handler: H,
    diagnostics: &Arc<ConnectionDiagnostics>,
    hook: Option<ConnectionHook>,
) {
    if let Some(hook) = hook {
        hook(Arc::clone(diagnostics));
    }
    let connection_id = diagnostics.handle().id;
    handler.on_open();

    loop {
        let control = tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => handler.on_text(text.as_str()),
                Some(Ok(Message::Binary(_))) => handler.on_non_text(),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => Control::Continue,
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
            },
            Some(out) = outbound.recv() => match out {
                Outbound::Text(text) => {
                    debug!(%connection_id, frame = %text, "ws: send frame");
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                    Control::Continue
                }
                Outbound::Close(code, reason) => Control::Close(code, reason),
            },
        };

        if let Control::Close(code, reason) = control {
            info!(%connection_id, code, %reason, "ws: closing connection");
            let frame = CloseFrame { code, reason: reason.into() };
            let _ = socket.send(Message::Close(Some(frame))).await;
            break;
        }
    }
}
