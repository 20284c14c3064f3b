//! Stdio MCP server: read loop, method dispatch, response writing.
//!
//! Requests are handled one at a time. Notifications queued by the
//! transport during a request are written after that request's response;
//! any queued between requests are written as they arrive.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::discovery::DiscoveryProvider;
use crate::kernel::Kernel;
use crate::mcp::codec::{
    self, Inbound, LineReader, Request, Response, RpcError, DEFAULT_MAX_LINE_BYTES,
};
use crate::mcp::stdio::StdioTransport;
use crate::tools::{CommandProvider, CompositeProvider};
use crate::types::{Config, Error, Result, ServerConfig, INVALID_PARAMS};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server bound to one client session.
#[derive(Debug)]
pub struct McpServer {
    kernel: Arc<Kernel>,
    transport: Arc<StdioTransport>,
    outbound: mpsc::UnboundedReceiver<Value>,
    config: ServerConfig,
    cancel: CancellationToken,
    lines: LineReader,
}

impl McpServer {
    pub fn new(
        kernel: Arc<Kernel>,
        transport: Arc<StdioTransport>,
        outbound: mpsc::UnboundedReceiver<Value>,
        config: ServerConfig,
    ) -> Self {
        Self {
            kernel,
            transport,
            outbound,
            config,
            cancel: CancellationToken::new(),
            lines: LineReader::new(DEFAULT_MAX_LINE_BYTES),
        }
    }

    /// Cap on a single inbound message; longer lines get a parse error.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.lines = LineReader::new(max_line_bytes);
        self
    }

    /// Build the provider, kernel, and transport from config and run the
    /// startup activation.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut provider =
            CompositeProvider::new().with(CommandProvider::from_config(&config.provider)?);
        if config.toolsets.dynamic_tools {
            provider = provider.with(DiscoveryProvider);
        }

        let (transport, outbound) = StdioTransport::new();
        let kernel = Arc::new(Kernel::from_provider(
            &provider,
            transport.clone(),
            config.toolsets.allow_non_ga_tools,
        )?);

        let report = kernel
            .engine()
            .bootstrap(config.toolsets.startup_toolsets())
            .await;
        if let Some(failure) = report.failures().next() {
            if let Err(err) = &failure.outcome {
                return Err(Error::internal(format!(
                    "startup activation of {} failed: {err}",
                    failure.tool
                )));
            }
        }

        Ok(Self::new(kernel, transport, outbound, config.server.clone()))
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    /// Token that stops [`serve`](Self::serve) when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run until EOF on `reader`, cancellation, or an I/O error.
    pub async fn serve<R, W>(mut self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            server = %self.config.name,
            tools = self.transport.registered_count(),
            "MCP server listening on stdio"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    break;
                }
                Some(message) = self.outbound.recv() => {
                    codec::write_message(&mut writer, &message).await?;
                }
                message = self.lines.next_message(&mut reader) => {
                    let Some(inbound) = message? else {
                        tracing::info!("client closed stdin");
                        break;
                    };
                    if let Some(response) = self.handle_inbound(inbound).await {
                        codec::write_message(&mut writer, &response).await?;
                    }
                    while let Ok(message) = self.outbound.try_recv() {
                        codec::write_message(&mut writer, &message).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_inbound(&self, inbound: Inbound) -> Option<Response> {
        match inbound {
            Inbound::Invalid(response) => {
                let reason = response.error.as_ref().map(|e| e.message.as_str());
                tracing::warn!(reason, "rejecting malformed message");
                Some(response)
            }
            Inbound::Request(request) if request.is_notification() => {
                self.handle_notification(&request);
                None
            }
            Inbound::Request(request) => Some(self.handle_request(request).await),
        }
    }

    fn handle_notification(&self, request: &Request) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::debug!("client initialized"),
            other => tracing::debug!(method = other, "ignoring notification"),
        }
    }

    async fn handle_request(&self, request: Request) -> Response {
        let id = request.id.clone().unwrap_or(Value::Null);
        tracing::debug!(method = %request.method, "handling request");
        match request.method.as_str() {
            "initialize" => Response::success(id, self.initialize_result(request.params.as_ref())),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(id, self.tools_list_result()),
            "tools/call" => self.tools_call(id, request.params).await,
            other => {
                let err = Error::not_found(format!("method {other}"));
                Response::failure(id, RpcError::from(&err))
            }
        }
    }

    fn initialize_result(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .cloned()
            .unwrap_or_else(|| json!(DEFAULT_PROTOCOL_VERSION));
        let mut result = json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": true } },
            "serverInfo": { "name": self.config.name, "version": self.config.version },
        });
        if let Some(instructions) = &self.config.instructions {
            result["instructions"] = json!(instructions);
        }
        result
    }

    fn tools_list_result(&self) -> Value {
        json!({ "tools": self.transport.definitions() })
    }

    async fn tools_call(&self, id: Value, params: Option<Value>) -> Response {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::error(id, INVALID_PARAMS, "Missing required field: name");
        };
        if !self.transport.is_registered(name) {
            return Response::error(id, INVALID_PARAMS, format!("Unknown tool: {name}"));
        }
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.kernel.call_tool(name, arguments).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => Response::success(id, value),
                Err(e) => Response::failure(id, RpcError::from(&Error::from(e))),
            },
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "tool call failed");
                Response::failure(id, RpcError::from(&err))
            }
        }
    }
}
