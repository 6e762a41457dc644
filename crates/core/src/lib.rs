// Tool registry and dispatch shell shared by the toolhost servers

pub mod arguments;
pub mod coerce;
pub mod error;
pub mod registry;
pub mod types;

pub use arguments::Arguments;
pub use error::{RegistryError, ToolError, ToolResult};
pub use registry::{handler_fn, FnHandler, ToolHandler, ToolRegistry};
pub use types::*;
