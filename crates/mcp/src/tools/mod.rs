pub mod calculator;
pub mod postgres;
pub mod rds;
pub mod s3;

use toolhost_core::ToolError;

/// Log a collaborator failure and wrap it as a handler error, message intact
pub(crate) fn collaborator_failure(action: &'static str) -> impl Fn(anyhow::Error) -> ToolError {
    move |err| {
        tracing::error!("Error {}: {:#}", action, err);
        ToolError::from(err)
    }
}
