// Integer arithmetic tools

use serde_json::{json, Value};
use toolhost_core::{
    handler_fn, Arguments, ParamType, ParameterSpec, RegistryError, ReturnType, ToolDescriptor,
    ToolError, ToolRegistry,
};

fn binary_descriptor(name: &str, description: &str, first: &str, second: &str) -> ToolDescriptor {
    ToolDescriptor::new(name, description, ReturnType::Integer)
        .param(ParameterSpec::required("a", ParamType::Integer, first))
        .param(ParameterSpec::required("b", ParamType::Integer, second))
}

fn apply(args: &Arguments, op: fn(i64, i64) -> Option<i64>) -> Result<Value, ToolError> {
    let (a, b) = (args.i64("a")?, args.i64("b")?);
    op(a, b)
        .map(|v| json!(v))
        .ok_or_else(|| ToolError::handler(format!("Integer overflow computing result for {} and {}", a, b)))
}

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        binary_descriptor("sum", "Calculate the sum of two numbers", "The first number", "The second number"),
        handler_fn(|args| apply(args, i64::checked_add)),
    )?;

    registry.register(
        binary_descriptor(
            "sub",
            "Calculate the difference between two numbers",
            "The first number",
            "The second number",
        ),
        handler_fn(|args| apply(args, i64::checked_sub)),
    )?;

    registry.register(
        binary_descriptor("multiply", "Calculate the product of two numbers", "The first number", "The second number"),
        handler_fn(|args| apply(args, i64::checked_mul)),
    )?;

    registry.register(
        binary_descriptor("divide", "Calculate the quotient of two numbers", "The dividend", "The divisor"),
        handler_fn(|args| {
            if args.i64("b")? == 0 {
                return Err(ToolError::handler("Cannot divide by zero"));
            }
            apply(args, i64::checked_div)
        }),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhost_core::{ErrorKind, InvocationRequest, InvocationResult};

    fn calculator() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    async fn call(registry: &ToolRegistry, tool: &str, args: Value) -> InvocationResult {
        registry
            .invoke(InvocationRequest::from_value(tool, args).unwrap())
            .await
    }

    #[test]
    fn test_registers_four_tools() {
        let names: Vec<String> = calculator().list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["sum", "sub", "multiply", "divide"]);
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = calculator();
        assert_eq!(
            register(&mut registry).unwrap_err(),
            RegistryError::DuplicateTool("sum".to_string())
        );
    }

    #[tokio::test]
    async fn test_arithmetic() {
        let registry = calculator();
        assert_eq!(call(&registry, "sum", json!({"a": 2, "b": 3})).await, InvocationResult::success(5));
        assert_eq!(call(&registry, "sub", json!({"a": 10, "b": 4})).await, InvocationResult::success(6));
        assert_eq!(call(&registry, "multiply", json!({"a": 6, "b": 7})).await, InvocationResult::success(42));
        assert_eq!(call(&registry, "divide", json!({"a": 10, "b": 2})).await, InvocationResult::success(5));
        assert_eq!(call(&registry, "divide", json!({"a": -7, "b": 2})).await, InvocationResult::success(-3));
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let registry = calculator();
        let result = call(&registry, "divide", json!({"a": 5, "b": 0})).await;
        assert_eq!(
            result,
            InvocationResult::failure(ErrorKind::HandlerError, "Cannot divide by zero")
        );
    }

    #[tokio::test]
    async fn test_overflow_is_handler_error() {
        let registry = calculator();
        let result = call(&registry, "sum", json!({"a": i64::MAX, "b": 1})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::HandlerError));

        let result = call(&registry, "divide", json!({"a": i64::MIN, "b": -1})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::HandlerError));
    }

    #[tokio::test]
    async fn test_string_operands() {
        let registry = calculator();
        assert_eq!(
            call(&registry, "multiply", json!({"a": "6", "b": "7"})).await,
            InvocationResult::success(42)
        );
        assert_eq!(
            call(&registry, "multiply", json!({"a": "six", "b": 7})).await.error_kind(),
            Some(ErrorKind::TypeMismatch)
        );
    }

    #[tokio::test]
    async fn test_idempotent() {
        let registry = calculator();
        let first = call(&registry, "sum", json!({"a": 2, "b": 3})).await;
        let second = call(&registry, "sum", json!({"a": 2, "b": 3})).await;
        assert_eq!(first, second);
    }
}
