// Coerced tool arguments handed to handlers

use serde_json::{Map, Value};

use crate::coerce::describe;
use crate::error::ToolError;
use crate::types::ParamType;

/// Arguments after validation and coercion.
///
/// Values are guaranteed to match their declared types when built by the
/// registry, so the typed getters only fail on absent parameters or when a
/// handler asks for the wrong type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.typed(name, ParamType::Integer, Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        self.typed(name, ParamType::Number, Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.typed(name, ParamType::Boolean, Value::as_bool)
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.typed(name, ParamType::String, Value::as_str)
    }

    /// Optional string parameter; empty strings count as absent
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: ParamType,
        extract: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<T, ToolError> {
        let value = self
            .get(name)
            .ok_or_else(|| ToolError::MissingParameter(name.to_string()))?;
        extract(value).ok_or_else(|| ToolError::TypeMismatch {
            param: name.to_string(),
            expected,
            found: describe(value),
        })
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::from(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_typed_getters() {
        let a = args(json!({"a": 4, "ratio": 0.5, "flag": true, "name": "users"}));
        assert_eq!(a.i64("a").unwrap(), 4);
        assert_eq!(a.f64("ratio").unwrap(), 0.5);
        assert!(a.bool("flag").unwrap());
        assert_eq!(a.str("name").unwrap(), "users");
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let a = args(json!({"name": "users", "nothing": null}));
        assert_eq!(
            a.i64("a").unwrap_err(),
            ToolError::MissingParameter("a".to_string())
        );
        assert_eq!(
            a.str("nothing").unwrap_err(),
            ToolError::MissingParameter("nothing".to_string())
        );
        assert!(matches!(
            a.i64("name").unwrap_err(),
            ToolError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_opt_str_treats_empty_as_absent() {
        let a = args(json!({"region": "", "prefix": "logs/"}));
        assert_eq!(a.opt_str("region"), None);
        assert_eq!(a.opt_str("prefix"), Some("logs/"));
        assert_eq!(a.opt_str("missing"), None);
    }
}
