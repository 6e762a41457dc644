// Tool registry and dispatcher

use crate::arguments::Arguments;
use crate::coerce::{coerce, describe};
use crate::error::{RegistryError, ToolError};
use crate::types::{InvocationRequest, InvocationResult, ToolDescriptor};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Handler invoked with validated, coerced arguments
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError>;
}

/// Adapter turning a synchronous closure into a [`ToolHandler`]
pub struct FnHandler<F>(F);

#[async_trait::async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync,
{
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        (self.0)(&args)
    }
}

pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Registry of available tools.
///
/// Populated once during start-up, then shared read-only (usually behind an
/// `Arc`) with whatever transport feeds it requests.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        let mut seen = HashSet::new();
        for param in &descriptor.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(RegistryError::DuplicateParameter {
                    tool: descriptor.name.clone(),
                    param: param.name.clone(),
                });
            }
        }

        tracing::debug!(tool = %descriptor.name, params = descriptor.parameters.len(), "Registered tool");
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { descriptor, handler });
        Ok(())
    }

    /// List all tool descriptors in registration order
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one invocation. Never fails: every error, including a
    /// handler panic, comes back as `InvocationResult::Failure`.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let tool_name = request.tool_name.clone();

        match self.dispatch(request).await {
            Ok(value) => {
                tracing::debug!(tool = %tool_name, "Tool call succeeded");
                InvocationResult::success(value)
            }
            Err(err) => {
                tracing::warn!(tool = %tool_name, kind = %err.kind(), error = %err, "Tool call failed");
                err.into()
            }
        }
    }

    async fn dispatch(&self, request: InvocationRequest) -> Result<Value, ToolError> {
        let tool = self
            .index
            .get(&request.tool_name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;

        let args = bind_arguments(&tool.descriptor, &request.arguments)?;

        let value = AssertUnwindSafe(tool.handler.call(args))
            .catch_unwind()
            .await
            .map_err(|panic| ToolError::Handler(panic_message(&*panic)))??;

        if !tool.descriptor.returns.matches(&value) {
            return Err(ToolError::Handler(format!(
                "Tool '{}' returned {}, expected {}",
                tool.descriptor.name,
                describe(&value),
                tool.descriptor.returns
            )));
        }

        Ok(value)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate supplied arguments against a descriptor and coerce them.
///
/// `null` counts as "not supplied".
fn bind_arguments(
    descriptor: &ToolDescriptor,
    supplied: &Map<String, Value>,
) -> Result<Arguments, ToolError> {
    if let Some(extra) = supplied.keys().find(|k| descriptor.parameter(k).is_none()) {
        return Err(ToolError::UnexpectedParameter(extra.clone()));
    }

    let mut args = Arguments::new();
    for spec in &descriptor.parameters {
        match supplied.get(&spec.name).filter(|v| !v.is_null()) {
            Some(value) => args.insert(spec.name.clone(), coerce(spec, value)?),
            None => match &spec.default {
                Some(default) => args.insert(spec.name.clone(), default.clone()),
                None if spec.required => {
                    return Err(ToolError::MissingParameter(spec.name.clone()))
                }
                None => {}
            },
        }
    }

    Ok(args)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("Tool handler panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("Tool handler panicked: {}", msg)
    } else {
        "Tool handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, ParamType, ParameterSpec, ReturnType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(tool: &str, args: Value) -> InvocationRequest {
        InvocationRequest::from_value(tool, args).unwrap()
    }

    fn pair_descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, format!("{} two numbers", name), ReturnType::Integer)
            .param(ParameterSpec::required("a", ParamType::Integer, "The first number"))
            .param(ParameterSpec::required("b", ParamType::Integer, "The second number"))
    }

    fn test_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                pair_descriptor("sum"),
                handler_fn(|args| Ok(json!(args.i64("a")? + args.i64("b")?))),
            )
            .unwrap();
        registry
            .register(
                pair_descriptor("divide"),
                handler_fn(|args| {
                    let b = args.i64("b")?;
                    if b == 0 {
                        return Err(ToolError::handler("Cannot divide by zero"));
                    }
                    Ok(json!(args.i64("a")? / b))
                }),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("greet", "Greet someone", ReturnType::String)
                    .param(ParameterSpec::optional("name", ParamType::String, "Who").with_default("world"))
                    .param(ParameterSpec::optional("shout", ParamType::Boolean, "Upper-case")),
                handler_fn(|args| {
                    let greeting = format!("hello {}", args.str("name")?);
                    if args.get("shout").and_then(Value::as_bool).unwrap_or(false) {
                        Ok(json!(greeting.to_uppercase()))
                    } else {
                        Ok(json!(greeting))
                    }
                }),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_register_duplicate_tool() {
        let mut registry = test_registry();
        let err = registry
            .register(pair_descriptor("sum"), handler_fn(|_| Ok(json!(0))))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("sum".to_string()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_duplicate_parameter() {
        let mut registry = ToolRegistry::new();
        let descriptor = pair_descriptor("twice")
            .param(ParameterSpec::required("a", ParamType::Integer, "again"));
        let err = registry
            .register(descriptor, handler_fn(|_| Ok(json!(0))))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateParameter { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_preserves_order_and_uniqueness() {
        let registry = test_registry();
        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["sum", "divide", "greet"]);

        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let registry = test_registry();
        let result = registry.invoke(request("sum", json!({"a": 2, "b": 3}))).await;
        assert_eq!(result, InvocationResult::success(5));

        let result = registry.invoke(request("divide", json!({"a": 10, "b": 2}))).await;
        assert_eq!(result.value(), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_invoke_coerces_numeric_strings() {
        let registry = test_registry();
        let result = registry.invoke(request("sum", json!({"a": "2", "b": 3}))).await;
        assert_eq!(result, InvocationResult::success(5));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = test_registry();
        let result = registry.invoke(request("nope", json!({}))).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownTool));
    }

    #[tokio::test]
    async fn test_missing_parameter_names_it() {
        let registry = test_registry();
        let result = registry.invoke(request("sum", json!({"a": 2}))).await;
        match result {
            InvocationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::MissingParameter);
                assert!(message.contains('b'), "message was: {}", message);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let result = registry.invoke(request("sum", json!({"a": 2, "b": null}))).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::MissingParameter));
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let registry = test_registry();
        let result = registry.invoke(request("sum", json!({"a": "two", "b": 3}))).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::TypeMismatch));
    }

    #[tokio::test]
    async fn test_unexpected_parameter() {
        let registry = test_registry();
        let result = registry
            .invoke(request("sum", json!({"a": 1, "b": 2, "c": 3})))
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::UnexpectedParameter));
    }

    #[tokio::test]
    async fn test_defaults_and_optional_parameters() {
        let registry = test_registry();
        let result = registry.invoke(request("greet", json!({}))).await;
        assert_eq!(result, InvocationResult::success("hello world"));

        let result = registry
            .invoke(request("greet", json!({"name": "rust", "shout": "true"})))
            .await;
        assert_eq!(result, InvocationResult::success("HELLO RUST"));
    }

    #[tokio::test]
    async fn test_handler_error_preserves_message() {
        let registry = test_registry();
        let result = registry.invoke(request("divide", json!({"a": 5, "b": 0}))).await;
        assert_eq!(
            result,
            InvocationResult::failure(ErrorKind::HandlerError, "Cannot divide by zero")
        );
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failure() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("explode", "Always panics", ReturnType::String),
                handler_fn(|_| panic!("boom")),
            )
            .unwrap();

        let result = registry.invoke(request("explode", json!({}))).await;
        match result {
            InvocationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::HandlerError);
                assert!(message.contains("boom"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_return_type_enforced() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("liar", "Claims to return an integer", ReturnType::Integer),
                handler_fn(|_| Ok(json!("not a number"))),
            )
            .unwrap();

        let result = registry.invoke(request("liar", json!({}))).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::HandlerError));
    }

    #[tokio::test]
    async fn test_repeated_invocations_are_identical() {
        let registry = test_registry();
        let first = registry.invoke(request("sum", json!({"a": 20, "b": 22}))).await;
        for _ in 0..5 {
            let again = registry.invoke(request("sum", json!({"a": 20, "b": 22}))).await;
            assert_eq!(again, first);
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ToolHandler for CountingHandler {
        async fn call(&self, _args: Arguments) -> Result<Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"ok": true}))
        }
    }

    #[tokio::test]
    async fn test_validation_failure_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("count", "Counts calls", ReturnType::Object)
                    .param(ParameterSpec::required("n", ParamType::Integer, "Anything")),
                Arc::new(CountingHandler { calls: calls.clone() }),
            )
            .unwrap();

        registry.invoke(request("count", json!({"n": "x"}))).await;
        registry.invoke(request("count", json!({}))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = registry.invoke(request("count", json!({"n": 1}))).await;
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
