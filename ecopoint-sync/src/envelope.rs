//! Response envelope handling.
//!
//! The backend wraps payloads as `{status, data}` or `{data}`; a few older
//! endpoints return the payload bare.

use ecopoint_core::FetchError;
use serde_json::Value;

const FAILURE_STATUSES: [&str; 3] = ["error", "fail", "failed"];

/// Parse a response body and return its payload.
///
/// An empty body yields `Value::Null`. A body whose `status` marks a failure
/// is an error even when the HTTP status was 2xx.
pub fn unwrap_envelope(endpoint: &str, body: &str) -> Result<Value, FetchError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let parsed: Value = serde_json::from_str(body).map_err(|e| FetchError::MalformedBody {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let Value::Object(mut map) = parsed else {
        return Ok(parsed);
    };

    if let Some(status) = map.get("status") {
        if is_failure_status(status) {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {}", status));
            return Err(FetchError::Backend {
                endpoint: endpoint.to_string(),
                message,
            });
        }
    }

    match map.remove("data") {
        Some(data) => Ok(data),
        None => Ok(Value::Object(map)),
    }
}

fn is_failure_status(status: &Value) -> bool {
    match status {
        Value::Bool(ok) => !ok,
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            FAILURE_STATUSES.contains(&s.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_and_data_envelope() {
        let body = r#"{"status":"success","data":{"poin":100}}"#;
        assert_eq!(unwrap_envelope("/s", body).unwrap(), json!({"poin": 100}));
    }

    #[test]
    fn test_data_only_envelope() {
        let body = r#"{"data":[1,2,3]}"#;
        assert_eq!(unwrap_envelope("/s", body).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_bare_payloads_pass_through() {
        assert_eq!(unwrap_envelope("/s", "[1]").unwrap(), json!([1]));
        assert_eq!(
            unwrap_envelope("/s", r#"{"poin":5}"#).unwrap(),
            json!({"poin": 5})
        );
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(unwrap_envelope("/s", "  ").unwrap(), Value::Null);
    }

    #[test]
    fn test_failure_status_is_backend_error() {
        let body = r#"{"status":"error","message":"user not found"}"#;
        match unwrap_envelope("/users/9/stats", body) {
            Err(FetchError::Backend { endpoint, message }) => {
                assert_eq!(endpoint, "/users/9/stats");
                assert_eq!(message, "user not found");
            }
            other => panic!("expected backend error, got {:?}", other),
        }

        let body = r#"{"status":false,"data":null}"#;
        assert!(matches!(
            unwrap_envelope("/s", body),
            Err(FetchError::Backend { .. })
        ));
    }

    #[test]
    fn test_numeric_status_is_not_a_failure_marker() {
        let body = r#"{"status":200,"data":{"ok":1}}"#;
        assert_eq!(unwrap_envelope("/s", body).unwrap(), json!({"ok": 1}));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            unwrap_envelope("/s", "<html>oops</html>"),
            Err(FetchError::MalformedBody { .. })
        ));
    }
}
