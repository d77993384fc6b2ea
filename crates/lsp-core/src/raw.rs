//! `RawJson` is an opaque, already-encoded JSON byte string. Envelope fields
//! that carry arbitrary, handler-controlled payloads (`params`, `result`,
//! `data`) are stored this way so the dispatcher never has to deserialize
//! and re-serialize values it doesn't interpret. Its JSON *type* is inferred
//! from the first non-whitespace byte at encode time.

use std::fmt;

use serde_json::Value;

/// An opaque, pre-encoded JSON value.
#[derive(Clone, PartialEq, Eq)]
pub struct RawJson(String);

impl RawJson {
    /// Wraps an already-serialized JSON string verbatim.
    pub fn new(text: impl Into<String>) -> Self {
        RawJson(text.into())
    }

    /// Serializes any `Serialize` value into a `RawJson`.
    pub fn from_value(value: &impl serde::Serialize) -> serde_json::Result<Self> {
        Ok(RawJson(serde_json::to_string(value)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parses the raw bytes back into a `serde_json::Value`.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.0)
    }

    /// The JSON type of this value, inferred from its first non-whitespace
    /// byte, mirroring the rule the codec uses when embedding raw fragments
    /// into a larger envelope without a full parse.
    pub fn inferred_kind(&self) -> JsonKind {
        match self.0.trim_start().as_bytes().first() {
            Some(b'{') => JsonKind::Object,
            Some(b'[') => JsonKind::Array,
            Some(b'"') => JsonKind::String,
            Some(b't') | Some(b'T') => JsonKind::True,
            Some(b'f') | Some(b'F') => JsonKind::False,
            Some(b'n') | Some(b'N') => JsonKind::Null,
            Some(c) if c.is_ascii_digit() || *c == b'-' => JsonKind::Number,
            _ => JsonKind::Null,
        }
    }
}

impl fmt::Debug for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawJson({})", self.0)
    }
}

/// JSON type classification used only to decide how a `RawJson` fragment is
/// spliced into a parent object: embedded verbatim either way, this is
/// diagnostic metadata rather than a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
    String,
    Number,
    True,
    False,
    Null,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_kind_from_first_byte() {
        assert_eq!(RawJson::new("{\"a\":1}").inferred_kind(), JsonKind::Object);
        assert_eq!(RawJson::new("[1,2]").inferred_kind(), JsonKind::Array);
        assert_eq!(RawJson::new("\"hi\"").inferred_kind(), JsonKind::String);
        assert_eq!(RawJson::new("42").inferred_kind(), JsonKind::Number);
        assert_eq!(RawJson::new("-3.5").inferred_kind(), JsonKind::Number);
        assert_eq!(RawJson::new("true").inferred_kind(), JsonKind::True);
        assert_eq!(RawJson::new("false").inferred_kind(), JsonKind::False);
        assert_eq!(RawJson::new("null").inferred_kind(), JsonKind::Null);
        assert_eq!(RawJson::new("  \n  [1]").inferred_kind(), JsonKind::Array);
    }

    #[test]
    fn round_trips_through_value() {
        let raw = RawJson::from_value(&serde_json::json!({"k": [1, 2, 3]})).unwrap();
        let value = raw.to_value().unwrap();
        assert_eq!(value, serde_json::json!({"k": [1, 2, 3]}));
    }
}
