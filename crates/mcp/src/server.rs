// MCP server: line-delimited JSON-RPC over stdio, dispatching into a ToolRegistry

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use toolhost_core::coerce::describe;
use toolhost_core::{InvocationRequest, ToolRegistry};

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolSchema, ToolsCapability, PROTOCOL_VERSION,
};

/// Upper bound on a single request line
const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

pub struct McpServer {
    info: ServerInfo,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(info: ServerInfo, registry: Arc<ToolRegistry>) -> Self {
        Self { info, registry }
    }

    /// Serve requests on stdin/stdout until stdin closes
    pub async fn start(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from any line-oriented byte stream.
    ///
    /// Requests are handled strictly one after another: each invocation runs
    /// to completion and its response is flushed before the next line is read.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        tracing::info!(
            server = %self.info.name,
            version = %self.info.version,
            tools = self.registry.len(),
            "MCP server listening on stdio"
        );

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::warn!("Dropping request longer than {} bytes", MAX_LINE_LENGTH);
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error("request line too long"),
                    );
                    Self::write(&mut sink, &response).await?;
                    continue;
                }
                Err(LinesCodecError::Io(e)) => {
                    return Err(e).context("Failed to read from transport");
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                Self::write(&mut sink, &response).await?;
            }
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    async fn write<W>(sink: &mut FramedWrite<W, LinesCodec>, response: &JsonRpcResponse) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let encoded = serde_json::to_string(response).context("Failed to encode response")?;
        sink.send(encoded)
            .await
            .context("Failed to write response")?;
        Ok(())
    }

    /// Handle one raw request line. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Received malformed JSON");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(e)));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }
        let id = request.id.clone().unwrap_or_default();

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        tracing::debug!(method = %request.method, "Handling request");
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: Option<InitializeParams> = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?;

        let protocol_version = params
            .as_ref()
            .and_then(|p| p.protocol_version.clone())
            .unwrap_or_else(|| PROTOCOL_VERSION.to_string());

        if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
            tracing::info!(client = %client.name, version = %client.version, "Client connected");
        }

        to_result(InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self
            .registry
            .list()
            .iter()
            .map(ToolSchema::from)
            .collect();
        to_result(ListToolsResult { tools })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        let request = InvocationRequest::from_value(params.name, params.arguments).map_err(|other| {
            JsonRpcError::invalid_params(format!(
                "Tool arguments must be an object, got {}",
                describe(&other)
            ))
        })?;

        let result = self.registry.invoke(request).await;
        to_result(CallToolResult::from(result))
    }
}

fn to_result(value: impl Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to encode result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhost_core::{handler_fn, ParamType, ParameterSpec, ReturnType, ToolDescriptor};

    fn test_server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("echo", "Echo a message", ReturnType::String)
                    .param(ParameterSpec::required("message", ParamType::String, "Message")),
                handler_fn(|args| Ok(json!(args.str("message")?))),
            )
            .unwrap();

        McpServer::new(
            ServerInfo {
                name: "test-server".to_string(),
                version: "0.0.1".to_string(),
            },
            Arc::new(registry),
        )
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"host","version":"1"}}}"#)
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_null_id_gets_a_response() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, json!("a"));
        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["message"]));
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_tool_result() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"missing","arguments":{}}}"#)
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("UnknownTool"));
    }

    #[tokio::test]
    async fn test_non_object_arguments_are_invalid_params() {
        let server = test_server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":[1]}}"#)
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = test_server();

        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);
        assert_eq!(response.id, Value::Null);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!(5));
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);

        let response = server
            .handle_line(r#"{"jsonrpc":"1.0","id":6,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }
}
