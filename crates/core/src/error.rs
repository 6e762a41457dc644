//! Error types for tool registration and dispatch.

use crate::types::{ErrorKind, ParamType};

/// Result type for tool handlers.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised while dispatching or running a tool.
///
/// Every variant maps onto exactly one [`ErrorKind`]; the dispatcher turns
/// these into `InvocationResult::Failure` values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required parameter was not supplied.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A supplied value could not be converted to the declared type.
    #[error("Parameter '{param}' expects {expected}, got {found}")]
    TypeMismatch {
        param: String,
        expected: ParamType,
        found: String,
    },

    /// The caller supplied a parameter the tool does not declare.
    #[error("Unexpected parameter: {0}")]
    UnexpectedParameter(String),

    /// A statement was refused because it could modify data.
    #[error("{0}")]
    ReadOnlyViolation(String),

    /// The handler or one of its collaborators failed.
    #[error("{0}")]
    Handler(String),
}

impl ToolError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::UnexpectedParameter(_) => ErrorKind::UnexpectedParameter,
            Self::ReadOnlyViolation(_) => ErrorKind::ReadOnlyViolation,
            Self::Handler(_) => ErrorKind::HandlerError,
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Handler(format!("Failed to encode tool output: {}", err))
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Tool '{tool}' declares parameter '{param}' more than once")]
    DuplicateParameter { tool: String, param: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_message_preserved() {
        let err: ToolError = anyhow::anyhow!("AccessDenied: not authorized").into();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
        assert_eq!(err.to_string(), "AccessDenied: not authorized");
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = ToolError::TypeMismatch {
            param: "a".to_string(),
            expected: ParamType::Integer,
            found: "string \"abc\"".to_string(),
        };
        assert_eq!(err.to_string(), "Parameter 'a' expects integer, got string \"abc\"");
    }
}
