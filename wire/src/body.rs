//! Request body assembly for GET, POST JSON and POST multipart.

use serde_json::{Map, Value};

use crate::filemap::build_multipart_file_map;
use crate::{BodyError, Files, Method, Variables};

/// The payload an adapter puts on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// JSON object: the POST body, or the GET query fields.
    Json(Map<String, Value>),
    /// Multipart upload envelope with JSON-encoded parts.
    Multipart { operations: String, map: String },
}

impl RequestBody {
    /// Render the body as string fields, the way GET query strings and
    /// multipart text parts carry them.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        match self {
            Self::Json(fields) => fields
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
            Self::Multipart { operations, map } => vec![
                ("operations".to_owned(), operations.clone()),
                ("map".to_owned(), map.clone()),
            ],
        }
    }
}

/// Assemble a GraphQL-over-HTTP request body.
///
/// Returns `Ok(None)` when there is no query, which adapters use for
/// non-GraphQL passthrough requests.
///
/// # Errors
///
/// Returns [`BodyError::Precondition`] when variables or files are given
/// without a query, or files without variables. File-map failures and JSON
/// encoding failures propagate.
pub fn build_body(
    query: Option<&str>,
    variables: Option<&Variables>,
    files: Option<&Files>,
    method: Method,
) -> Result<Option<RequestBody>, BodyError> {
    let Some(query) = query else {
        if files.is_some() {
            return Err(BodyError::Precondition("files given without a query"));
        }
        if variables.is_some() {
            return Err(BodyError::Precondition("variables given without a query"));
        }
        return Ok(None);
    };

    let mut body = Map::new();
    body.insert("query".to_owned(), Value::String(query.to_owned()));

    let non_empty_variables = variables.filter(|v| !v.is_empty());
    if let Some(vars) = non_empty_variables {
        body.insert("variables".to_owned(), Value::Object(vars.clone()));
    }

    if let Some(files) = files.filter(|f| !f.is_empty()) {
        let Some(vars) = variables else {
            return Err(BodyError::Precondition("files given without variables"));
        };
        let file_map = build_multipart_file_map(vars, files)?;
        return Ok(Some(RequestBody::Multipart {
            operations: serde_json::to_string(&body)?,
            map: serde_json::to_string(&file_map)?,
        }));
    }

    if method == Method::Get {
        if let Some(vars) = non_empty_variables {
            body.insert("variables".to_owned(), Value::String(serde_json::to_string(vars)?));
        }
    }

    Ok(Some(RequestBody::Json(body)))
}

#[cfg(test)]
#[path = "body_test.rs"]
mod tests;
