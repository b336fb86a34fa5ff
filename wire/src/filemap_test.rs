use super::*;
use crate::FilePart;
use serde_json::json;

fn variables(value: Value) -> Variables {
    value.as_object().cloned().expect("variables must be an object")
}

fn files(names: &[&str]) -> Files {
    names
        .iter()
        .map(|name| ((*name).to_owned(), FilePart::new(format!("{name}.txt"), name.as_bytes())))
        .collect()
}

#[test]
fn variables_without_placeholders_map_nothing() {
    let vars = variables(json!({"name": "strawberry", "count": 3, "tags": ["a", "b"], "input": {"x": 1}}));
    let map = build_multipart_file_map(&vars, &files(&["0"])).unwrap();
    assert!(map.is_empty());
}

#[test]
fn single_file_variable_maps_to_variable_path() {
    let vars = variables(json!({"textFile": null}));
    let map = build_multipart_file_map(&vars, &files(&["textFile"])).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["textFile"], vec!["variables.textFile"]);
}

#[test]
fn non_list_file_uses_variable_key_as_field_name() {
    // The destination field is the variable key, not the name from `files`.
    let vars = variables(json!({"textFile": null}));
    let map = build_multipart_file_map(&vars, &files(&["upload"])).unwrap();
    assert!(!map.contains_key("upload"));
    assert_eq!(map["textFile"], vec!["variables.textFile"]);
}

#[test]
fn list_variable_consumes_files_in_insertion_order() {
    let vars = variables(json!({"files": [null, null, null]}));
    let map = build_multipart_file_map(&vars, &files(&["0", "1", "2"])).unwrap();
    let entries: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    assert_eq!(
        entries,
        vec![
            ("0", vec!["variables.files.0".to_owned()]),
            ("1", vec!["variables.files.1".to_owned()]),
            ("2", vec!["variables.files.2".to_owned()]),
        ]
    );
}

#[test]
fn folder_variable_joins_inner_key() {
    let vars = variables(json!({"folder": {"files": [null, null]}}));
    let map = build_multipart_file_map(&vars, &files(&["file1", "file2"])).unwrap();
    assert_eq!(map["file1"], vec!["variables.folder.files.0"]);
    assert_eq!(map["file2"], vec!["variables.folder.files.1"]);
}

#[test]
fn folder_unwrapping_is_one_level_only() {
    let vars = variables(json!({"outer": {"inner": {"deep": null}}}));
    let map = build_multipart_file_map(&vars, &files(&["0"])).unwrap();
    assert!(map.is_empty());
}

#[test]
fn each_list_variable_draws_from_full_pool() {
    let vars = variables(json!({"first": [null], "second": [null, null]}));
    let map = build_multipart_file_map(&vars, &files(&["a", "b"])).unwrap();
    assert_eq!(map["a"], vec!["variables.first.0", "variables.second.0"]);
    assert_eq!(map["b"], vec!["variables.second.1"]);
}

#[test]
fn list_longer_than_files_is_rejected() {
    let vars = variables(json!({"files": [null, null, null]}));
    let err = build_multipart_file_map(&vars, &files(&["0"])).unwrap_err();
    assert!(matches!(
        err,
        BodyError::NotEnoughFiles { ref variable, needed: 3, available: 1 } if variable == "files"
    ));
}
