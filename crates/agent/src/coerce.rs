//! Parameter coercion — raw oracle arguments into declared parameter types.
//!
//! Oracles are loose about types: numbers arrive as strings, lists as
//! comma-separated text, objects as embedded JSON. Every key is converted
//! independently. A value that cannot be converted is kept as-is with a
//! warning, except for malformed `mapping` text, which fails the whole call.

use curator_core::action::{ActionSpec, Args, ParamType};
use curator_core::decision::truthy;
use curator_core::error::CoercionError;
use serde_json::{Number, Value};
use tracing::warn;

/// Convert every key of `raw` according to `spec`.
///
/// Keys not declared by the action pass through unchanged.
pub fn coerce(raw: &Args, spec: &ActionSpec) -> Result<Args, CoercionError> {
    let mut out = Args::new();

    for (name, value) in raw {
        let converted = match spec.param_spec(name) {
            Some(param) => coerce_value(name, value, param.kind)?,
            None => {
                warn!(action = %spec.name, param = %name, "Unknown parameter, passing through");
                value.clone()
            }
        };
        out.insert(name.clone(), converted);
    }

    Ok(out)
}

/// Fill declared defaults for parameters the oracle left out.
pub fn fill_defaults(args: &mut Args, spec: &ActionSpec) {
    for param in &spec.params {
        if let Some(default) = &param.default {
            args.entry(param.name.clone()).or_insert_with(|| default.clone());
        }
    }
}

/// Convert a single value to `kind`.
pub fn coerce_value(name: &str, value: &Value, kind: ParamType) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let converted = match kind {
        ParamType::Integer => to_integer(value),
        ParamType::Float => to_float(value),
        ParamType::Boolean => Some(Value::Bool(truthy(value))),
        ParamType::List => Some(to_list(value)),
        ParamType::Mapping => return to_mapping(name, value),
        ParamType::String => Some(Value::String(to_text(value))),
    };

    Ok(converted.unwrap_or_else(|| {
        warn!(param = %name, value = %value, expected = kind.as_str(), "Conversion failed, keeping raw value");
        value.clone()
    }))
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .map(f64::trunc)
            // `i64::MAX as f64` rounds up to 2^63, which is out of range.
            .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    Number::from_f64(f).map(Value::Number)
}

fn to_list(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Array(_)) => parsed,
            _ => Value::Array(s.split(',').map(|item| Value::String(item.trim().to_string())).collect()),
        },
        other => Value::Array(vec![other.clone()]),
    }
}

fn to_mapping(name: &str, value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Object(_) => Ok(value.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => Ok(parsed),
            Ok(other) => Err(CoercionError {
                param: name.to_string(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(CoercionError {
                param: name.to_string(),
                reason: e.to_string(),
            }),
        },
        other => {
            warn!(param = %name, value = %other, "Cannot convert to mapping, passing through");
            Ok(other.clone())
        }
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
