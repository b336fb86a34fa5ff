use super::*;
use std::collections::VecDeque;

/// Replays a fixed script of frames; a close frame marks the client closed.
struct ScriptedClient {
    inbox: VecDeque<Message>,
    sent: Vec<Value>,
    closed: bool,
    close_code: Option<u16>,
    close_reason: Option<String>,
}

impl ScriptedClient {
    fn new(frames: Vec<Message>) -> Self {
        Self { inbox: frames.into(), sent: Vec::new(), closed: false, close_code: None, close_reason: None }
    }
}

#[async_trait]
impl WebSocketClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_json(&mut self, payload: &Value) -> Result<(), HarnessError> {
        self.sent.push(payload.clone());
        Ok(())
    }

    async fn send_bytes(&mut self, _payload: &[u8]) -> Result<(), HarnessError> {
        Ok(())
    }

    async fn receive(&mut self, _timeout: Option<Duration>) -> Result<Message, HarnessError> {
        let Some(message) = self.inbox.pop_front() else {
            return Err(HarnessError::Timeout);
        };
        if message.kind == MessageKind::Close {
            self.closed = true;
            self.close_code = message.extra.as_deref().and_then(|c| c.parse().ok());
            self.close_reason = Some(String::from_utf8_lossy(&message.data).into_owned());
        }
        Ok(message)
    }

    async fn close(&mut self) -> Result<(), HarnessError> {
        self.closed = true;
        Ok(())
    }

    fn closed(&self) -> bool {
        self.closed
    }

    fn close_code(&self) -> Option<u16> {
        self.close_code
    }

    fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }
}

fn text(value: &Value) -> Message {
    Message::new(MessageKind::Text, value.to_string())
}

#[tokio::test]
async fn messages_stop_after_close_frame() {
    let mut client = ScriptedClient::new(vec![
        text(&serde_json::json!({"type": "connection_ack"})),
        text(&serde_json::json!({"type": "ka"})),
        Message::close(4400, "Failed to parse message"),
        text(&serde_json::json!({"type": "never"})),
    ]);

    let received: Vec<_> = messages(&mut client).collect().await;
    assert_eq!(received.len(), 3);
    assert_eq!(received[2].as_ref().unwrap().kind, MessageKind::Close);
    assert!(client.closed());
    assert_eq!(client.close_code(), Some(4400));
    client.assert_reason("Failed to parse message");
}

#[tokio::test]
async fn messages_resume_from_current_state() {
    let mut client = ScriptedClient::new(vec![
        text(&serde_json::json!({"n": 1})),
        text(&serde_json::json!({"n": 2})),
        Message::close(1000, ""),
    ]);

    let first = messages(&mut client).next().await.unwrap().unwrap();
    assert_eq!(first.json().unwrap()["n"], 1);

    let rest: Vec<_> = messages(&mut client).collect().await;
    assert_eq!(rest.len(), 2);
    assert!(messages(&mut client).next().await.is_none());
}

#[tokio::test]
async fn messages_on_closed_client_is_empty() {
    let mut client = ScriptedClient::new(vec![text(&serde_json::json!({}))]);
    client.close().await.unwrap();
    let dyn_client: &mut dyn WebSocketClient = &mut client;
    assert!(messages(dyn_client).next().await.is_none());
}

#[tokio::test]
async fn receive_json_decodes_payload() {
    let mut client = ScriptedClient::new(vec![text(&serde_json::json!({"type": "pong"}))]);
    let value = client.receive_json(None).await.unwrap();
    assert_eq!(value, serde_json::json!({"type": "pong"}));
    client.send_json(&value).await.unwrap();
    assert_eq!(client.sent, vec![value]);
    assert_eq!(client.name(), "scripted");
}

#[tokio::test]
async fn receive_json_propagates_decode_errors() {
    let mut client = ScriptedClient::new(vec![Message::new(MessageKind::Text, "not json")]);
    let err = client.receive_json(None).await.unwrap_err();
    assert!(matches!(err, HarnessError::Json(_)));
}

#[test]
#[should_panic(expected = "unexpected websocket close reason")]
fn assert_reason_panics_on_mismatch() {
    let client = ScriptedClient {
        inbox: VecDeque::new(),
        sent: Vec::new(),
        closed: true,
        close_code: Some(4401),
        close_reason: Some("Unauthorized".to_owned()),
    };
    client.assert_reason("Too many initialisation requests");
}

#[test]
fn close_message_carries_code_in_extra() {
    let message = Message::close(4408, "Connection initialisation timeout");
    assert_eq!(message.extra.as_deref(), Some("4408"));
    assert_eq!(message.data, b"Connection initialisation timeout");
}
