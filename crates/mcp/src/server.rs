// MCP server: JSON-RPC dispatch plus stdio and HTTP transports

use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability, PROTOCOL_VERSION,
};
use crate::tools::{tool_failure, ToolRegistry};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, warn};

const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

pub struct McpServer {
    info: ServerInfo,
    registry: ToolRegistry,
    instructions: Option<String>,
}

impl McpServer {
    pub fn new(info: ServerInfo, registry: ToolRegistry) -> Self {
        Self {
            info,
            registry,
            instructions: None,
        }
    }

    /// Text returned to clients in the `initialize` result
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one JSON-RPC message; notifications produce no response
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unparseable message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e),
                ));
            }
        };

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id.unwrap_or(Value::Null),
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        match request.id.clone() {
            None => {
                self.handle_notification(&request);
                None
            }
            Some(id) => Some(self.handle_request(id, request).await),
        }
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!(server = %self.info.name, "Client initialized"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    async fn handle_request(&self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        let params = request.params.unwrap_or(Value::Null);
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, &params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            method => {
                warn!(method, "Unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_initialize(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, server = %self.info.name, "Initialize");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        };
        to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let result = ListToolsResult {
            tools: self.registry.list_schemas(),
        };
        to_response(id, &result)
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)),
                );
            }
        };

        let Some(tool) = self.registry.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)),
            );
        };

        let started = Instant::now();
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool raised an error");
                tool_failure(format!("{:#}", e), "internal")
            }
        };

        info!(
            tool = %params.name,
            is_error = result.is_error(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );
        to_response(id, &result)
    }

    /// Serve newline-delimited JSON-RPC until the reader hits EOF
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Dropping message above {} bytes", MAX_LINE_BYTES);
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::invalid_request("Message too large"),
                    );
                    write_line(&mut writer, &response).await?;
                    continue;
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(bytes = line.len(), "Received message");

            if let Some(response) = self.handle_message(line).await {
                write_line(&mut writer, &response).await?;
            }
        }

        info!("EOF received, shutting down");
        Ok(())
    }

    pub async fn serve_stdio(self) -> Result<()> {
        info!(server = %self.info.name, tools = self.registry.len(), "Serving MCP on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/mcp", post(handle_http_message))
            .route("/health", get(health_check))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(false))
                    .on_response(DefaultOnResponse::new()),
            )
            .layer(CorsLayer::permissive())
            .with_state(self)
    }

    pub async fn serve_http(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(server = %self.info.name, addr = %listener.local_addr()?, "Serving MCP over HTTP");
        axum::serve(listener, Arc::new(self).router()).await?;
        Ok(())
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

async fn handle_http_message(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_check(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "server": server.info.name,
        "version": server.info.version,
        "tools": server.registry.len(),
    }))
}
