//! axum binding of the client contracts.
//!
//! DESIGN
//! ======
//! [`AxumHttpClient`] owns a [`TestServer`] and talks to it over loopback:
//! reqwest for HTTP, tokio-tungstenite for WebSockets. Request shaping is
//! delegated to `wire`; this module only maps the shaped request onto the
//! transport and the transport's reply back onto [`Response`] / [`Message`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use uuid::Uuid;
use wire::{Files, Headers, Method, RequestBody, build_body, resolve_headers};

use crate::GRAPHQL_PATH;
use crate::client::{GraphQLRequest, HttpClient, PostBody};
use crate::config::{ClientOptions, SchemaConfig};
use crate::engine::Engine;
use crate::error::HarnessError;
use crate::protocol::ConnectionDiagnostics;
use crate::response::Response;
use crate::server::TestServer;
use crate::server::ws::CONNECTION_ID_HEADER;
use crate::ws::{Message, MessageKind, WebSocketClient};

/// Builds the engine under test from the engine settings in the options.
pub type SchemaFactory = Arc<dyn Fn(&SchemaConfig) -> Engine + Send + Sync>;

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct AxumHttpClient {
    server: TestServer,
    http: reqwest::Client,
    factory: SchemaFactory,
}

impl AxumHttpClient {
    /// Build the engine, serve it from a fresh axum app and connect to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind or the HTTP client cannot
    /// be built.
    pub async fn start<F>(factory: F, options: ClientOptions) -> Result<Self, HarnessError>
    where
        F: Fn(&SchemaConfig) -> Engine + Send + Sync + 'static,
    {
        let factory: SchemaFactory = Arc::new(factory);
        let server = TestServer::spawn(factory(&options.schema_config), options).await?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self { server, http, factory })
    }

    #[must_use]
    pub fn server(&self) -> &TestServer {
        &self.server
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    /// Open a WebSocket session with access to its server-side diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or the server refuses every
    /// offered sub-protocol.
    pub async fn connect(&self, path: &str, protocols: &[&str]) -> Result<AxumWebSocketClient, HarnessError> {
        let mut request = self.server.ws_url(path).into_client_request()?;
        if !protocols.is_empty() {
            let offered = HeaderValue::from_str(&protocols.join(", "))?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, offered);
        }

        let (stream, response) = connect_async(request).await?;
        let diagnostics = response
            .headers()
            .get(CONNECTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .and_then(|id| self.server.state().connections.get(id));
        debug!(path, ?protocols, "adapter: websocket connected");

        Ok(AxumWebSocketClient::new(stream, diagnostics))
    }

    pub async fn shutdown(self) {
        self.server.shutdown().await;
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Response, HarnessError> {
        let reply = builder.send().await?;
        let status = reply.status().as_u16();
        let headers: HashMap<String, String> = reply
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
            .collect();
        let data = reply.bytes().await?.to_vec();
        Ok(Response::new(status, data, headers))
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

/// Convert resolved headers for reqwest. The framework-internal content type
/// spelling is sent as `Content-Type`; multipart requests drop any explicit
/// content type so the transport can add its boundary.
fn header_map(headers: &Headers, multipart: bool) -> Result<HeaderMap, HarnessError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = if name == "HTTP_CONTENT_TYPE" {
            reqwest::header::CONTENT_TYPE
        } else {
            HeaderName::from_bytes(name.as_bytes())?
        };
        if multipart && name == reqwest::header::CONTENT_TYPE {
            continue;
        }
        map.insert(name, HeaderValue::from_str(value)?);
    }
    Ok(map)
}

fn multipart_form(operations: String, map: String, files: &Files) -> Result<Form, HarnessError> {
    let mut form = Form::new().text("operations", operations).text("map", map);
    for (field, file) in files {
        let mut part = Part::bytes(file.content.clone()).file_name(file.filename.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        form = form.part(field.clone(), part);
    }
    Ok(form)
}

#[async_trait]
impl HttpClient for AxumHttpClient {
    async fn graphql_request(&self, method: Method, request: GraphQLRequest) -> Result<Response, HarnessError> {
        let variables = request.variables_map()?;
        let files = request.files.unwrap_or_default();
        let body = build_body(
            request.query.as_deref(),
            variables.as_ref(),
            (!files.is_empty()).then_some(&files),
            method,
        )?;
        let headers = resolve_headers(method, request.headers.as_ref(), !files.is_empty());
        let multipart = matches!(body, Some(RequestBody::Multipart { .. }));

        let mut builder = self
            .http
            .request(http_method(method), self.server.url(GRAPHQL_PATH))
            .headers(header_map(&headers, multipart)?);

        builder = match body {
            None => builder,
            Some(RequestBody::Multipart { operations, map }) => {
                builder.multipart(multipart_form(operations, map, &files)?)
            }
            Some(body) if method == Method::Get => builder.query(&body.to_query_pairs()),
            Some(RequestBody::Json(fields)) => builder.body(serde_json::to_vec(&fields)?),
        };

        debug!(method = method.as_str(), multipart, "adapter: graphql request");
        self.send(builder).await
    }

    async fn request(&self, url: &str, method: Method, headers: Option<Headers>) -> Result<Response, HarnessError> {
        let headers = header_map(&headers.unwrap_or_default(), false)?;
        let builder = self.http.request(http_method(method), self.server.url(url)).headers(headers);
        self.send(builder).await
    }

    async fn get(&self, url: &str, headers: Option<Headers>) -> Result<Response, HarnessError> {
        self.request(url, Method::Get, headers).await
    }

    async fn post(&self, url: &str, body: PostBody, headers: Option<Headers>) -> Result<Response, HarnessError> {
        let headers = header_map(&headers.unwrap_or_default(), false)?;
        let builder = self.http.post(self.server.url(url)).headers(headers);
        let builder = match body {
            PostBody::Empty => builder,
            PostBody::Bytes(bytes) => builder.body(bytes),
            PostBody::Json(value) => builder.json(&value),
        };
        self.send(builder).await
    }

    async fn create_app(&mut self, options: ClientOptions) -> Result<(), HarnessError> {
        let engine = (self.factory)(&options.schema_config);
        let server = TestServer::spawn(engine, options).await?;
        let previous = std::mem::replace(&mut self.server, server);
        info!(addr = %self.server.addr(), "adapter: app rebuilt");
        previous.shutdown().await;
        Ok(())
    }

    async fn ws_connect(&self, url: &str, protocols: &[&str]) -> Result<Box<dyn WebSocketClient>, HarnessError> {
        let client = self.connect(url, protocols).await?;
        Ok(Box::new(client))
    }
}

// =============================================================================
// WEBSOCKET CLIENT
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct AxumWebSocketClient {
    stream: WsStream,
    diagnostics: Option<Arc<ConnectionDiagnostics>>,
    closed: bool,
    close_code: Option<u16>,
    close_reason: Option<String>,
}

impl AxumWebSocketClient {
    fn new(stream: WsStream, diagnostics: Option<Arc<ConnectionDiagnostics>>) -> Self {
        Self { stream, diagnostics, closed: false, close_code: None, close_reason: None }
    }

    /// Server-side diagnostics of this connection.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Arc<ConnectionDiagnostics>> {
        self.diagnostics.as_ref()
    }

    fn record_close(&mut self, frame: Option<&CloseFrame>) -> Message {
        self.closed = true;
        let code = frame.map_or(1005, |f| u16::from(f.code));
        let reason = frame.map(|f| f.reason.as_str().to_owned()).unwrap_or_default();
        self.close_code = Some(code);
        self.close_reason = Some(reason.clone());
        Message::close(code, &reason)
    }

    async fn next_frame(&mut self, timeout: Option<Duration>) -> Result<Option<WsFrame>, HarnessError> {
        let next = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.next())
                .await
                .map_err(|_| HarnessError::Timeout)?,
            None => self.stream.next().await,
        };
        match next {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => {
                self.closed = true;
                Err(e.into())
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WebSocketClient for AxumWebSocketClient {
    fn name(&self) -> &str {
        "axum"
    }

    async fn send_json(&mut self, payload: &Value) -> Result<(), HarnessError> {
        self.stream.send(WsFrame::Text(payload.to_string().into())).await?;
        Ok(())
    }

    async fn send_bytes(&mut self, payload: &[u8]) -> Result<(), HarnessError> {
        self.stream.send(WsFrame::Binary(payload.to_vec().into())).await?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Option<Duration>) -> Result<Message, HarnessError> {
        if self.closed {
            return Err(HarnessError::WsClosed);
        }
        loop {
            let Some(frame) = self.next_frame(timeout).await? else {
                self.closed = true;
                return Err(HarnessError::WsClosed);
            };
            let message = match frame {
                WsFrame::Text(text) => Message::new(MessageKind::Text, text.as_str()),
                WsFrame::Binary(bytes) => Message::new(MessageKind::Binary, bytes.to_vec()),
                WsFrame::Ping(bytes) => Message::new(MessageKind::Ping, bytes.to_vec()),
                WsFrame::Pong(bytes) => Message::new(MessageKind::Pong, bytes.to_vec()),
                WsFrame::Close(frame) => self.record_close(frame.as_ref()),
                WsFrame::Frame(_) => continue,
            };
            return Ok(message);
        }
    }

    async fn close(&mut self) -> Result<(), HarnessError> {
        if !self.closed {
            // Errors here mean the peer is already gone.
            let _ = self.stream.close(None).await;
            while let Some(frame) = self.stream.next().await {
                match frame {
                    Ok(WsFrame::Close(frame)) => {
                        self.record_close(frame.as_ref());
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            self.closed = true;
        }
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.wait_closed().await;
        }
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
