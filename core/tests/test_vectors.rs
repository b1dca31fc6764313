//! Verify message extraction and status classification against the JSON
//! vectors stored in `test-vectors/`.

use exchange_core::extract::{decode_error_body, extract_message};
use exchange_core::{classify, ErrorKind, ExchangeError};

fn parse_kind(s: &str) -> ErrorKind {
    match s {
        "Unauthorized" => ErrorKind::Unauthorized,
        "RequestLimitExceeded" => ErrorKind::RequestLimitExceeded,
        "Remote" => ErrorKind::Remote,
        other => panic!("unknown error kind: {other}"),
    }
}

fn message(err: &ExchangeError) -> &str {
    match err {
        ExchangeError::Unauthorized(m) | ExchangeError::RequestLimitExceeded(m) => m,
        ExchangeError::Remote { message, .. } => message,
        other => panic!("not a remote failure: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[test]
fn extract_test_vectors() {
    let raw = include_str!("../../test-vectors/extract.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let body = case["body"].as_str().unwrap();
        let expected = case["expected"].as_str().unwrap();

        let decoded = decode_error_body(body.as_bytes());
        assert!(!decoded.contains(['\r', '\n']), "{name}: line breaks survived");
        assert_eq!(extract_message(&decoded), expected, "{name}: extracted message");
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap();

        let result = classify(status, body.as_bytes());

        match case["expected_error"].as_str() {
            None => assert!(result.is_none(), "{name}: expected success"),
            Some(kind) => {
                let err = result.unwrap_or_else(|| panic!("{name}: expected an error"));
                assert_eq!(err.kind(), parse_kind(kind), "{name}: kind");
                assert_eq!(
                    message(&err),
                    case["expected_message"].as_str().unwrap(),
                    "{name}: message"
                );
                assert_eq!(err.http_status(), Some(status), "{name}: status");
            }
        }
    }
}
