//! HTTP client contract every framework adapter implements.

use async_trait::async_trait;
use serde_json::Value;
use wire::{Files, Headers, Method, Variables};

use crate::config::ClientOptions;
use crate::error::HarnessError;
use crate::response::Response;
use crate::ws::WebSocketClient;

/// One GraphQL-over-HTTP request, before it is shaped for the wire.
///
/// A request without a query is sent as a plain passthrough request.
#[derive(Debug, Clone, Default)]
pub struct GraphQLRequest {
    pub query: Option<String>,
    pub variables: Option<Value>,
    pub files: Option<Files>,
    pub headers: Option<Headers>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()), ..Self::default() }
    }

    /// Variables must be a JSON object; anything else is rejected when the
    /// request is sent.
    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn files(mut self, files: Files) -> Self {
        self.files = Some(files);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    /// Variables as the map the body builder expects.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when variables are not a JSON object.
    pub fn variables_map(&self) -> Result<Option<Variables>, HarnessError> {
        match &self.variables {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(wire::BodyError::Precondition("variables must be a JSON object").into()),
        }
    }
}

/// Body for the low-level `post` passthrough.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PostBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Json(Value),
}

/// Uniform HTTP operations over one framework binding.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue one GraphQL request to the adapter's GraphQL endpoint.
    async fn graphql_request(&self, method: Method, request: GraphQLRequest) -> Result<Response, HarnessError>;

    async fn request(&self, url: &str, method: Method, headers: Option<Headers>) -> Result<Response, HarnessError>;

    async fn get(&self, url: &str, headers: Option<Headers>) -> Result<Response, HarnessError>;

    async fn post(&self, url: &str, body: PostBody, headers: Option<Headers>) -> Result<Response, HarnessError>;

    /// POST a GraphQL request.
    async fn query(&self, request: GraphQLRequest) -> Result<Response, HarnessError> {
        self.graphql_request(Method::Post, request).await
    }

    /// Rebuild the app with different options, for WebSocket-only setups.
    async fn create_app(&mut self, _options: ClientOptions) -> Result<(), HarnessError> {
        Err(HarnessError::NotImplemented("create_app"))
    }

    /// Open a WebSocket session offering `protocols`.
    async fn ws_connect(&self, _url: &str, _protocols: &[&str]) -> Result<Box<dyn WebSocketClient>, HarnessError> {
        Err(HarnessError::NotImplemented("ws_connect"))
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
