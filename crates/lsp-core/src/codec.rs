//! Encodes JSON-RPC 2.0 envelopes to raw frames and classifies decoded
//! frames into request/response/notification.

use serde_json::{Map, Value};

use crate::id::{Id, IdOrNull};
use crate::raw::RawJson;

/// The outcome carried by a decoded response frame.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Option<Value>),
    Error {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

/// A frame, classified by the presence/absence of `id` and `method`.
#[derive(Debug, Clone)]
pub enum Decoded {
    Request {
        id: Id,
        method: String,
        params: Option<Value>,
    },
    Response {
        id: IdOrNull,
        outcome: Outcome,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

/// Parses one JSON-RPC payload and classifies it:
/// - has both `id` and `method` → request
/// - has `id`, no `method` → response
/// - has `method`, no `id` → notification
/// - anything else → `None` (protocol error, reported by the caller)
pub fn decode(payload: &str) -> serde_json::Result<Option<Decoded>> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(obj) = value else {
        return Ok(None);
    };
    Ok(classify(&obj))
}

fn classify(obj: &Map<String, Value>) -> Option<Decoded> {
    let id = obj.get("id");
    let method = obj.get("method").and_then(Value::as_str);

    match (id, method) {
        (Some(id_value), Some(method)) => {
            let id = Id::from_value(id_value)?;
            Some(Decoded::Request {
                id,
                method: method.to_string(),
                params: obj.get("params").cloned(),
            })
        }
        (Some(id_value), None) => {
            let id = IdOrNull::from_value(id_value);
            let outcome = decode_outcome(obj)?;
            Some(Decoded::Response { id, outcome })
        }
        (None, Some(method)) => Some(Decoded::Notification {
            method: method.to_string(),
            params: obj.get("params").cloned(),
        }),
        (None, None) => None,
    }
}

/// `result` present → success; `error` present → error (reading the
/// standard `code`/`message`/`data` fields); neither → malformed, `None`.
fn decode_outcome(obj: &Map<String, Value>) -> Option<Outcome> {
    if let Some(result) = obj.get("result") {
        return Some(Outcome::Success(Some(result.clone())));
    }
    if let Some(error) = obj.get("error") {
        let code = error.get("code")?.as_i64()?;
        let message = error.get("message")?.as_str()?.to_string();
        let data = error.get("data").cloned();
        return Some(Outcome::Error { code, message, data });
    }
    None
}

/// Builds the JSON text for an outgoing request.
pub fn encode_request(id: &Id, method: &str, params: Option<&RawJson>) -> String {
    let mut obj = Map::new();
    obj.insert("jsonrpc".into(), Value::from("2.0"));
    obj.insert("id".into(), id.to_value());
    obj.insert("method".into(), Value::from(method));
    let head = Value::Object(obj).to_string();
    match params {
        Some(params) => splice_field(&head, "params", params),
        None => head,
    }
}

/// Builds the JSON text for an outgoing notification.
pub fn encode_notification(method: &str, params: Option<&RawJson>) -> String {
    let mut obj = Map::new();
    obj.insert("jsonrpc".into(), Value::from("2.0"));
    obj.insert("method".into(), Value::from(method));
    let head = Value::Object(obj).to_string();
    match params {
        Some(params) => splice_field(&head, "params", params),
        None => head,
    }
}

/// Builds the JSON text for an outgoing success response.
pub fn encode_success(id: &IdOrNull, result: Option<&RawJson>) -> String {
    let mut obj = Map::new();
    obj.insert("jsonrpc".into(), Value::from("2.0"));
    obj.insert("id".into(), id.to_value());
    match result {
        Some(result) => {
            let head = Value::Object(obj).to_string();
            splice_field(&head, "result", result)
        }
        None => {
            obj.insert("result".into(), Value::Null);
            Value::Object(obj).to_string()
        }
    }
}

/// Builds the JSON text for an outgoing error response.
pub fn encode_error(id: &IdOrNull, code: i64, message: &str, data: Option<&RawJson>) -> String {
    let mut error = Map::new();
    error.insert("code".into(), Value::from(code));
    error.insert("message".into(), Value::from(message));
    let error_text = Value::Object(error).to_string();
    let error_text = match data {
        Some(data) => splice_field(&error_text, "data", data),
        None => error_text,
    };

    let mut obj = Map::new();
    obj.insert("jsonrpc".into(), Value::from("2.0"));
    obj.insert("id".into(), id.to_value());
    let head = Value::Object(obj).to_string();
    splice_field(&head, "error", &RawJson::new(error_text))
}

/// Appends `"field":<raw bytes>` onto a JSON object's text, just before its
/// closing brace, instead of parsing `raw` back into a `Value` and
/// re-serializing it. A reparse-then-reserialize round trip would silently
/// renormalize number literals handlers control (e.g. `1.50` becomes `1.5`)
/// and loses precision for integers outside `i64`/`f64` range, since this
/// crate doesn't enable `arbitrary_precision`. Grounded in the original
/// client's `writer_->RawValue(...)` calls, which write a pre-encoded
/// fragment straight into the output stream without ever reparsing it.
fn splice_field(object_text: &str, field: &str, raw: &RawJson) -> String {
    debug_assert!(object_text.starts_with('{') && object_text.ends_with('}'));
    let body = &object_text[..object_text.len() - 1];
    let needs_comma = body.len() > 1;
    let mut out = String::with_capacity(body.len() + field.len() + raw.as_str().len() + 8);
    out.push_str(body);
    if needs_comma {
        out.push(',');
    }
    out.push_str(&serde_json::to_string(field).expect("field names always serialize"));
    out.push(':');
    out.push_str(raw.as_str().trim());
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_request() {
        let decoded = decode(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(decoded, Decoded::Request { id: Id::Int(1), .. }));
    }

    #[test]
    fn classifies_notification() {
        let decoded = decode(r#"{"jsonrpc":"2.0","method":"initialized"}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(decoded, Decoded::Notification { .. }));
    }

    #[test]
    fn classifies_success_response() {
        let decoded = decode(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(
            decoded,
            Decoded::Response {
                outcome: Outcome::Success(_),
                ..
            }
        ));
    }

    #[test]
    fn classifies_error_response_using_code_not_id() {
        let decoded = decode(r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"nope"}}"#)
            .unwrap()
            .unwrap();
        match decoded {
            Decoded::Response {
                outcome: Outcome::Error { code, message, .. },
                ..
            } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn malformed_envelope_has_neither_id_nor_method() {
        assert!(decode(r#"{"jsonrpc":"2.0"}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_response_has_neither_result_nor_error() {
        assert!(decode(r#"{"jsonrpc":"2.0","id":1}"#).unwrap().is_none());
    }

    #[test]
    fn encode_request_round_trips() {
        let text = encode_request(&Id::Int(7), "foo", None);
        let decoded = decode(&text).unwrap().unwrap();
        assert!(matches!(decoded, Decoded::Request { id: Id::Int(7), ref method, .. } if method == "foo"));
    }

    #[test]
    fn encode_success_with_raw_params() {
        let raw = RawJson::new(r#"{"ok":true}"#);
        let text = encode_success(&IdOrNull::Id(Id::Int(1)), Some(&raw));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["result"]["ok"], Value::from(true));
    }

    #[test]
    fn encode_success_splices_raw_result_bytes_verbatim() {
        // A reparse-then-reserialize round trip would collapse "1.50" into
        // "1.5"; splicing the bytes verbatim must not.
        let raw = RawJson::new(r#"{"amount":1.50}"#);
        let text = encode_success(&IdOrNull::Id(Id::Int(1)), Some(&raw));
        assert!(text.contains(r#""amount":1.50"#), "got: {text}");
    }

    #[test]
    fn encode_error_splices_raw_data_bytes_verbatim() {
        let raw = RawJson::new(r#"{"retryAfterMs":100}"#);
        let text = encode_error(&IdOrNull::Id(Id::Int(1)), -32000, "busy", Some(&raw));
        assert!(text.contains(r#""retryAfterMs":100"#), "got: {text}");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["error"]["code"], Value::from(-32000));
        assert_eq!(value["error"]["data"]["retryAfterMs"], Value::from(100));
    }

    #[test]
    fn encode_request_splices_raw_params_bytes_verbatim() {
        let raw = RawJson::new(r#"{"big":123456789012345678901234567890}"#);
        let text = encode_request(&Id::Int(1), "custom/op", Some(&raw));
        assert!(text.contains("123456789012345678901234567890"), "got: {text}");
    }
}
