use super::*;
use serde_json::json;

fn response(body: &str) -> Response {
    let headers = HashMap::from([("Content-Type".to_owned(), "application/json".to_owned())]);
    Response::new(200, body.as_bytes().to_vec(), headers)
}

#[test]
fn text_and_json_views_decode_body() {
    let resp = response(r#"{"data":{"hello":"world"}}"#);
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.text().unwrap(), r#"{"data":{"hello":"world"}}"#);
    assert_eq!(resp.json().unwrap(), json!({"data": {"hello": "world"}}));
}

#[test]
fn json_view_propagates_decode_failure() {
    let resp = response("Unable to parse request body as JSON");
    assert!(resp.json().is_err());
    assert!(resp.text().is_ok());
}

#[test]
fn header_lookup_ignores_case() {
    let resp = response("{}");
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.header("CONTENT-TYPE"), Some("application/json"));
    assert!(resp.headers().contains_key("content-type"));
    assert_eq!(resp.header("x-missing"), None);
}

#[test]
fn text_view_rejects_invalid_utf8() {
    let resp = Response::new(200, vec![0xff, 0xfe], HashMap::new());
    assert!(resp.text().is_err());
}
