// JSON Schema helpers for advertising tool inputs

use serde_json::{json, Map, Value};
use toolhost_core::{ParamType, ParameterSpec, ToolDescriptor};

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub fn json_schema_property(param_type: ParamType, description: &str) -> Value {
    json!({
        "type": param_type.as_str(),
        "description": description
    })
}

fn parameter_schema(spec: &ParameterSpec) -> Value {
    let mut schema = json_schema_property(spec.param_type, &spec.description);
    if let (Some(default), Value::Object(fields)) = (&spec.default, &mut schema) {
        fields.insert("default".to_string(), default.clone());
    }
    schema
}

/// Build the `inputSchema` advertised for a tool
pub fn input_schema(descriptor: &ToolDescriptor) -> Value {
    let properties: Map<String, Value> = descriptor
        .parameters
        .iter()
        .map(|p| (p.name.clone(), parameter_schema(p)))
        .collect();

    let required = descriptor
        .parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    json_schema_object(Value::Object(properties), required)
}
