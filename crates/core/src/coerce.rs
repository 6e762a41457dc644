// Argument coercion: one rule per declared parameter type

use serde_json::Value;

use crate::error::ToolError;
use crate::types::{ParamType, ParameterSpec};

/// Convert a loosely-typed argument into the declared parameter type.
///
/// | declared | accepted |
/// |----------|----------|
/// | integer  | JSON integer, integral float, numeric string |
/// | number   | JSON number, numeric string |
/// | string   | JSON string |
/// | boolean  | JSON bool, `"true"` / `"false"` |
pub fn coerce(spec: &ParameterSpec, value: &Value) -> Result<Value, ToolError> {
    let coerced = match spec.param_type {
        ParamType::Integer => to_integer(value),
        ParamType::Number => to_number(value),
        ParamType::String => value.as_str().map(|s| Value::String(s.to_string())),
        ParamType::Boolean => to_boolean(value),
    };

    coerced.ok_or_else(|| ToolError::TypeMismatch {
        param: spec.name.clone(),
        expected: spec.param_type,
        found: describe(value),
    })
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Value::from(i));
            }
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| Value::from(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).map(Value::from)
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Short human-readable description of a JSON value's type, for error messages
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) if s.chars().count() > 32 => {
            let head: String = s.chars().take(32).collect();
            format!("string \"{}...\"", head)
        }
        Value::String(s) => format!("string \"{}\"", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
