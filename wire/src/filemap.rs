//! Multipart upload map.
//!
//! The GraphQL multipart request convention sends the operation with `null`
//! placeholders where files go, plus a `map` part telling the server which
//! form field fills which variable path. A placeholder may sit directly in a
//! variable, in a list (one file per element), or one level down inside a
//! single-key "folder" object.

use indexmap::IndexMap;
use serde_json::Value;

use crate::{BodyError, Files, Variables};

/// Form-field name to the variable paths it fills.
pub type FileMap = IndexMap<String, Vec<String>>;

/// Build the `map` part for a multipart request.
///
/// Each list variable draws field names from a fresh copy of `files`, in
/// insertion order. A non-list placeholder is mapped under the variable key
/// itself rather than a field name from `files`.
///
/// # Errors
///
/// Returns [`BodyError::NotEnoughFiles`] when a list has more placeholders
/// than `files` has entries.
pub fn build_multipart_file_map(variables: &Variables, files: &Files) -> Result<FileMap, BodyError> {
    let mut file_map = FileMap::new();

    for (key, value) in variables {
        let (key, value) = unwrap_folder(key, value);

        match value {
            Value::Array(items) if is_placeholder_list(items) => {
                let mut pool = files.keys();
                for index in 0..items.len() {
                    let Some(field) = pool.next() else {
                        return Err(BodyError::NotEnoughFiles {
                            variable: key,
                            needed: items.len(),
                            available: files.len(),
                        });
                    };
                    file_map
                        .entry(field.clone())
                        .or_default()
                        .push(format!("variables.{key}.{index}"));
                }
            }
            Value::Null => {
                let path = format!("variables.{key}");
                file_map.insert(key, vec![path]);
            }
            _ => {}
        }
    }

    Ok(file_map)
}

/// Descend into a folder object, one level only.
fn unwrap_folder<'a>(key: &str, value: &'a Value) -> (String, &'a Value) {
    if let Value::Object(folder) = value {
        if let Some((folder_key, inner)) = folder.iter().next() {
            return (format!("{key}.{folder_key}"), inner);
        }
    }
    (key.to_owned(), value)
}

fn is_placeholder_list(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_null)
}

#[cfg(test)]
#[path = "filemap_test.rs"]
mod tests;
