//! HTTP response value object.

use std::collections::HashMap;

/// A completed HTTP response. Immutable once built by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    data: Vec<u8>,
    /// Header names are stored lower-cased.
    headers: HashMap<String, String>,
}

impl Response {
    #[must_use]
    pub fn new(status_code: u16, data: Vec<u8>, headers: HashMap<String, String>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self { status_code, data, headers }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Body decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the decode error for non-UTF-8 bodies.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    /// Body decoded as JSON. Decode failures are returned untouched so tests
    /// can assert on malformed bodies.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}

#[cfg(test)]
#[path = "response_test.rs"]
mod tests;
