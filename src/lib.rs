//! Uniform GraphQL test clients over real web framework bindings.
//!
//! SYSTEM CONTEXT
//! ==============
//! A GraphQL engine's conformance suite talks to the engine through
//! [`HttpClient`] and [`WebSocketClient`] only. Each adapter binds those
//! contracts to one framework; [`AxumHttpClient`] serves the engine from an
//! axum app on a loopback port and drives it with reqwest and
//! tokio-tungstenite.
//!
//! DESIGN
//! ======
//! - Request shaping (bodies, multipart maps, headers) lives in the `wire`
//!   crate and is pure.
//! - Every test client owns its own [`TestServer`]; nothing is global.
//! - WebSocket handlers expose [`ConnectionDiagnostics`] so tests can watch
//!   per-operation tasks without reaching into handler internals.

pub mod adapter;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod response;
pub mod server;
pub mod ws;

pub use adapter::{AxumHttpClient, AxumWebSocketClient};
pub use client::{GraphQLRequest, HttpClient, PostBody};
pub use config::{ClientOptions, HarnessConfig, SchemaConfig, init_tracing};
pub use context::{RequestContext, ResultOverride, inject_shared_context};
pub use engine::Engine;
pub use error::HarnessError;
pub use protocol::{ConnectionDiagnostics, ConnectionHandle, Protocol, TaskSnapshot};
pub use response::Response;
pub use server::TestServer;
pub use wire::{FilePart, Files, Headers, Method, Variables};
pub use ws::{Message, MessageKind, WebSocketClient, messages};

/// Path every adapter registers the GraphQL view on.
pub const GRAPHQL_PATH: &str = "/graphql";
