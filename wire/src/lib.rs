//! GraphQL-over-HTTP request shaping for the test harness.
//!
//! This crate owns the wire-level shape of every request the harness sends:
//! the JSON body for POST, the query-string fields for GET, and the
//! `operations`/`map` envelope of the GraphQL multipart upload convention.
//! It performs no I/O and evaluates no GraphQL; adapters call it and then
//! hand the result to whatever transport they drive.

mod body;
mod filemap;
mod headers;

use indexmap::IndexMap;

pub use body::{RequestBody, build_body};
pub use filemap::{FileMap, build_multipart_file_map};
pub use headers::{Headers, resolve_headers};

/// Error returned while shaping a request.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The caller broke a body-building precondition (test-author error).
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    /// A list variable needs more file fields than `files` provides.
    #[error("variable `{variable}` needs {needed} files but only {available} were given")]
    NotEnoughFiles {
        variable: String,
        needed: usize,
        available: usize,
    },
    /// A body fragment could not be JSON-encoded.
    #[error("failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// HTTP verbs the harness can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    /// Upper-case method name as it appears on the request line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

/// One uploaded file, sent as a multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Form-field name to file payload. Insertion order is consumption order.
pub type Files = IndexMap<String, FilePart>;

/// GraphQL input variables, in declaration order.
pub type Variables = serde_json::Map<String, serde_json::Value>;
