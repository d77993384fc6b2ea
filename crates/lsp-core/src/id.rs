//! The JSON-RPC 2.0 id is a tagged union of integer and string. Map lookups
//! must key on this union rather than on a normalized string, or distinct
//! ids (`1` and `"1"`) collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request/response id: either an integer or a string, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(i) => write!(f, "{i}"),
            Id::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Id {
    /// Parses an id out of a decoded `serde_json::Value`, accepting only the
    /// two shapes JSON-RPC allows for a non-null id.
    pub fn from_value(value: &Value) -> Option<Id> {
        match value {
            Value::Number(n) => n.as_i64().map(Id::Int),
            Value::String(s) => Some(Id::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Id::Int(i) => Value::from(*i),
            Id::Str(s) => Value::from(s.clone()),
        }
    }
}

/// Same as `Id` but responses may also carry a JSON `null` id (malformed
/// request, or a protocol-level error with no recoverable id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdOrNull {
    Id(Id),
    Null,
}

impl IdOrNull {
    pub fn from_value(value: &Value) -> IdOrNull {
        match value {
            Value::Null => IdOrNull::Null,
            other => Id::from_value(other).map(IdOrNull::Id).unwrap_or(IdOrNull::Null),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            IdOrNull::Id(id) => id.to_value(),
            IdOrNull::Null => Value::Null,
        }
    }

    pub fn as_id(&self) -> Option<&Id> {
        match self {
            IdOrNull::Id(id) => Some(id),
            IdOrNull::Null => None,
        }
    }
}

impl From<Id> for IdOrNull {
    fn from(id: Id) -> Self {
        IdOrNull::Id(id)
    }
}
