//! WebSocket upgrade for the `/graphql` view.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::http::header::SEC_WEBSOCKET_PROTOCOL;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::protocol::{self, ConnectionDiagnostics, ConnectionHandle, Protocol, SessionOptions};

/// Response header carrying the id of the accepted connection.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Sub-protocols offered in `Sec-WebSocket-Protocol`, in header order.
fn offered_protocols(headers: &HeaderMap) -> Vec<&str> {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Accept the upgrade with the preferred supported sub-protocol, or refuse
/// it with 400 when the client offered none.
pub fn upgrade(state: &AppState, headers: &HeaderMap, ws: WebSocketUpgrade) -> Response {
    let offered = offered_protocols(headers);
    let Some(protocol) = Protocol::select(offered.iter().copied()) else {
        warn!(?offered, "ws: no supported sub-protocol offered");
        return (StatusCode::BAD_REQUEST, "unsupported websocket sub-protocol").into_response();
    };

    let handle = ConnectionHandle { id: Uuid::new_v4(), protocol };
    let diagnostics = Arc::new(ConnectionDiagnostics::new(handle));
    state.connections.register(Arc::clone(&diagnostics));
    info!(connection_id = %handle.id, protocol = protocol.as_str(), "ws: upgrade accepted");

    let engine = state.engine.clone();
    let hook = state.options.on_connection.clone();
    let options = SessionOptions {
        connection_init_wait: state.options.connection_init_wait,
        keep_alive: state.options.keep_alive,
    };

    let mut response = ws
        .protocols([protocol.as_str()])
        .on_upgrade(move |socket| protocol::run(socket, engine, options, diagnostics, hook));

    if let Ok(value) = HeaderValue::from_str(&handle.id.to_string()) {
        response.headers_mut().insert(CONNECTION_ID_HEADER, value);
    }
    response
}
