//! Decision — the oracle's structured choice for one loop iteration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Args;
use crate::error::OracleError;

/// Placeholder used when the oracle omits its reasoning.
pub const MISSING_REASON: &str = "N/A";

/// One decision: which action to run, with what arguments, and why.
///
/// Wire shape: `{"action": .., "args": {..}, "reason": .., "stop": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub args: Args,

    #[serde(default = "default_reason")]
    pub reason: String,

    #[serde(default)]
    pub stop: bool,
}

fn default_reason() -> String {
    MISSING_REASON.to_string()
}

impl Decision {
    pub fn new(action: impl Into<String>, args: Args, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args,
            reason: reason.into(),
            stop: false,
        }
    }

    /// A decision that ends the loop.
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            action: String::new(),
            args: Args::new(),
            reason: reason.into(),
            stop: true,
        }
    }

    /// Read a decision from a decoded oracle payload.
    ///
    /// Only the top-level shape is enforced: the value must be an object.
    /// Missing or mistyped fields fall back to defaults.
    pub fn from_value(value: Value) -> std::result::Result<Self, OracleError> {
        let Value::Object(mut obj) = value else {
            return Err(OracleError::Decode {
                message: format!("expected a JSON object, got {}", kind_of(&value)),
            });
        };

        let action = match obj.remove("action") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let args = match obj.remove("args") {
            Some(Value::Object(map)) => map,
            _ => Args::new(),
        };
        let reason = match obj.remove("reason") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => default_reason(),
            Some(other) => other.to_string(),
        };
        let stop = obj.get("stop").map(truthy).unwrap_or(false);

        Ok(Self {
            action,
            args,
            reason,
            stop,
        })
    }

    /// The decision as a JSON object (the pending memory value).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Boolean interpretation used for `stop` and `boolean` parameters.
///
/// Text is true iff it lower-cases to `true`, `1` or `yes`. Other values use
/// generic truthiness: non-null, non-zero, non-empty.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
