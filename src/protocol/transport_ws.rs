//! `graphql-transport-ws` handler.
//!
//! Close codes follow the protocol: 4400 bad message, 4401 subscribe before
//! ack, 4408 init timeout, 4409 duplicate operation id, 4429 repeated init.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{Control, OperationFrames, Outbound, ProtocolHandler, Session};

const KNOWN_TYPES: [&str; 5] = ["connection_init", "ping", "pong", "subscribe", "complete"];

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ConnectionInit {
        #[serde(default)]
        payload: Option<Value>,
    },
    Ping {
        #[serde(default)]
        payload: Option<Value>,
    },
    Pong {},
    Subscribe {
        id: String,
        payload: async_graphql::Request,
    },
    Complete {
        id: String,
    },
}

const FRAMES: OperationFrames = OperationFrames { result: next_frame, error: error_frame };

fn next_frame(id: &str, response: &async_graphql::Response) -> Value {
    json!({"type": "next", "id": id, "payload": response})
}

fn error_frame(id: &str, response: &async_graphql::Response) -> Value {
    json!({"type": "error", "id": id, "payload": response.errors})
}

pub(crate) struct TransportWsHandler {
    session: Session,
    init_received: bool,
}

impl TransportWsHandler {
    pub fn new(session: Session) -> Self {
        Self { session, init_received: false }
    }
}

impl ProtocolHandler for TransportWsHandler {
    fn on_open(&mut self) {
        let outbound = self.session.outbound.clone();
        let wait = self.session.options.connection_init_wait;
        let timeout = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = outbound.send(Outbound::Close(4408, "Connection initialisation timeout".to_owned()));
        });
        self.session.diagnostics.set_init_timeout(timeout);
    }

    fn on_text(&mut self, text: &str) -> Control {
        let message = match parse(text) {
            Ok(message) => message,
            Err(control) => return control,
        };

        match message {
            ClientMessage::ConnectionInit { payload } => {
                if self.init_received {
                    return Control::Close(4429, "Too many initialisation requests".to_owned());
                }
                self.init_received = true;
                self.session.diagnostics.cancel_init_timeout();
                self.session.connection_params = payload;
                self.session.send(&json!({"type": "connection_ack"}));
            }
            ClientMessage::Ping { payload } => {
                let pong = match payload {
                    Some(payload) => json!({"type": "pong", "payload": payload}),
                    None => json!({"type": "pong"}),
                };
                self.session.send(&pong);
            }
            ClientMessage::Pong {} => {}
            ClientMessage::Subscribe { id, payload } => {
                if !self.init_received {
                    return Control::Close(4401, "Unauthorized".to_owned());
                }
                if self.session.diagnostics.has_operation(&id) {
                    return Control::Close(4409, format!("Subscriber for {id} already exists"));
                }
                self.session.spawn_operation(id, payload, FRAMES);
            }
            ClientMessage::Complete { id } => {
                self.session.diagnostics.cancel_operation(&id);
            }
        }
        Control::Continue
    }

    fn on_non_text(&mut self) -> Control {
        Control::Close(4400, "WebSocket message type must be text".to_owned())
    }
}

fn parse(text: &str) -> Result<ClientMessage, Control> {
    let failed = || Control::Close(4400, "Failed to parse message".to_owned());

    let value: Value = serde_json::from_str(text).map_err(|_| failed())?;
    let message_type = value.get("type").and_then(Value::as_str).map(ToOwned::to_owned);
    serde_json::from_value(value).map_err(|e| match message_type {
        Some(ty) if !KNOWN_TYPES.contains(&ty.as_str()) => {
            Control::Close(4400, format!("Unknown message type: {ty}"))
        }
        _ => {
            warn!(error = %e, "ws: malformed graphql-transport-ws message");
            failed()
        }
    })
}
