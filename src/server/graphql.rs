//! The `/graphql` view: GraphQL over HTTP plus the WebSocket upgrade.

use std::collections::HashMap;

use async_graphql::http::{GraphiQLSource, MultipartOptions, parse_query_string, receive_body};
use async_graphql::parser::types::OperationType;
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Json, Response};
use tracing::{debug, warn};

use super::AppState;
use crate::GRAPHQL_PATH;
use crate::context::{RequestContext, inject_shared_context};

/// Single entry point for every method registered on `/graphql`.
pub async fn graphql_view(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    body: Bytes,
) -> Response {
    if let Ok(ws) = upgrade {
        return super::ws::upgrade(&state, &headers, ws);
    }

    debug!(%method, %uri, "graphql: request");
    let request = match method {
        Method::GET => {
            if !params.contains_key("query") {
                return graphiql(&state, &headers);
            }
            match get_request(&state, uri.query().unwrap_or_default()) {
                Ok(request) => request,
                Err(rejection) => return rejection,
            }
        }
        Method::POST => match post_request(&headers, body).await {
            Ok(request) => request,
            Err(rejection) => return rejection,
        },
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    let context = inject_shared_context(
        RequestContext::new()
            .with("transport", "http")
            .with("method", method.as_str()),
    );
    let response = state.engine.execute(request.data(context)).await;

    let body = match &state.options.result_override {
        Some(result_override) => result_override(&response),
        None => match serde_json::to_value(&response) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "graphql: failed to serialize response");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };
    Json(body).into_response()
}

// =============================================================================
// GET
// =============================================================================

fn graphiql(state: &AppState, headers: &HeaderMap) -> Response {
    let accepts_html = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));
    if !state.options.graphiql || !accepts_html {
        return StatusCode::NOT_FOUND.into_response();
    }

    let page = GraphiQLSource::build()
        .endpoint(GRAPHQL_PATH)
        .subscription_endpoint(GRAPHQL_PATH)
        .finish();
    Html(page).into_response()
}

fn get_request(state: &AppState, raw_query: &str) -> Result<async_graphql::Request, Response> {
    if !state.options.allow_queries_via_get {
        return Err((StatusCode::BAD_REQUEST, "queries are not allowed when using GET").into_response());
    }

    let request = parse_query_string(raw_query)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
    if selects_mutation(&request) {
        return Err((StatusCode::METHOD_NOT_ALLOWED, "mutations are not allowed when using GET").into_response());
    }
    Ok(request)
}

/// Whether the operation the request would run is a mutation. Documents
/// that fail to parse are left for the engine to report.
fn selects_mutation(request: &async_graphql::Request) -> bool {
    let Ok(document) = async_graphql::parser::parse_query(&request.query) else {
        return false;
    };
    let wanted = request.operation_name.as_deref();
    document
        .operations
        .iter()
        .find(|(name, _)| wanted.is_none() || name.map(|n| n.as_str()) == wanted)
        .is_some_and(|(_, operation)| operation.node.ty == OperationType::Mutation)
}

// =============================================================================
// POST
// =============================================================================

async fn post_request(headers: &HeaderMap, body: Bytes) -> Result<async_graphql::Request, Response> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    if content_type.starts_with("application/json") {
        return serde_json::from_slice::<async_graphql::Request>(&body).map_err(|e| {
            debug!(error = %e, "graphql: invalid json body");
            (StatusCode::BAD_REQUEST, "Unable to parse request body as JSON").into_response()
        });
    }

    if content_type.starts_with("multipart/form-data") {
        let reader = futures::io::Cursor::new(body);
        return receive_body(Some(content_type.as_str()), reader, MultipartOptions::default())
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response());
    }

    Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported content type").into_response())
}
