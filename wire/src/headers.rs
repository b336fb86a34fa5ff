//! Effective request headers.

use indexmap::IndexMap;

use crate::Method;

/// Header name to value, in the order the caller supplied them.
pub type Headers = IndexMap<String, String>;

/// Framework-internal spelling of the content type header.
const INTERNAL_CONTENT_TYPE: &str = "HTTP_CONTENT_TYPE";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Compute the headers to send for a GraphQL request.
///
/// A caller-supplied content type in any spelling wins. Otherwise POST
/// without files defaults to JSON; multipart bodies get their boundary from
/// the transport, so no default is set for them.
#[must_use]
pub fn resolve_headers(method: Method, headers: Option<&Headers>, has_files: bool) -> Headers {
    let explicit = headers.and_then(|h| {
        h.iter()
            .find(|(name, value)| is_content_type(name) && !value.is_empty())
            .map(|(_, value)| value.clone())
    });

    let content_type =
        explicit.or_else(|| (method == Method::Post && !has_files).then(|| JSON_CONTENT_TYPE.to_owned()));

    let mut resolved = Headers::new();
    if let Some(content_type) = content_type {
        resolved.insert("Content-Type".to_owned(), content_type);
    }
    if let Some(headers) = headers {
        for (name, value) in headers {
            resolved.insert(name.clone(), value.clone());
        }
    }
    resolved
}

fn is_content_type(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-type") || name == INTERNAL_CONTENT_TYPE
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod tests;
