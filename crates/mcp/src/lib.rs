// MCP (Model Context Protocol) tool servers
// Each binary registers its tools with a ToolRegistry and serves it over stdio

pub mod aws;
pub mod cli;
pub mod config;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;

pub use config::ServerConfig;
pub use server::McpServer;
