//! Legacy `graphql-ws` handler (subscriptions-transport-ws framing).

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::{Control, OperationFrames, Outbound, ProtocolHandler, Session};

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ConnectionInit {
        #[serde(default)]
        payload: Option<Value>,
    },
    Start {
        id: String,
        payload: async_graphql::Request,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate {},
}

const FRAMES: OperationFrames = OperationFrames { result: data_frame, error: error_frame };

fn data_frame(id: &str, response: &async_graphql::Response) -> Value {
    json!({"type": "data", "id": id, "payload": response})
}

fn error_frame(id: &str, response: &async_graphql::Response) -> Value {
    json!({"type": "error", "id": id, "payload": response.errors.first()})
}

pub(crate) struct GraphQLWsHandler {
    session: Session,
}

impl GraphQLWsHandler {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn start_keep_alive(&self, interval: Duration) {
        let outbound = self.session.outbound.clone();
        let ka = json!({"type": "ka"}).to_string();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if outbound.send(Outbound::Text(ka.clone())).is_err() {
                    break;
                }
            }
        });
        self.session.diagnostics.set_keep_alive(task);
    }
}

impl ProtocolHandler for GraphQLWsHandler {
    fn on_text(&mut self, text: &str) -> Control {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "ws: ignoring malformed graphql-ws message");
                return Control::Continue;
            }
        };

        match message {
            ClientMessage::ConnectionInit { payload } => {
                self.session.connection_params = payload;
                self.session.send(&json!({"type": "connection_ack"}));
                if let Some(interval) = self.session.options.keep_alive {
                    self.start_keep_alive(interval);
                }
            }
            ClientMessage::Start { id, payload } => {
                self.session.diagnostics.cancel_operation(&id);
                self.session.spawn_operation(id, payload, FRAMES);
            }
            ClientMessage::Stop { id } => {
                self.session.diagnostics.cancel_operation(&id);
            }
            ClientMessage::ConnectionTerminate {} => {
                return Control::Close(1000, String::new());
            }
        }
        Control::Continue
    }

    fn on_non_text(&mut self) -> Control {
        Control::Close(1002, "WebSocket message type must be text".to_owned())
    }
}
