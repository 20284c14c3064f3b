//! Server transport seam.
//!
//! The activation engine is the only caller of [`ServerTransport::register`]
//! and guarantees at most one call per tool name over the process lifetime.
//! Implementations should treat a second registration as a fatal error and
//! report it as [`Error::TransportRegistration`](crate::Error).

use async_trait::async_trait;
use std::sync::Arc;

use crate::tools::ToolDescriptor;
use crate::types::Result;

/// Capability interface onto the live MCP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Make a tool listable and invocable.
    async fn register(&self, descriptor: Arc<ToolDescriptor>) -> Result<()>;

    /// Tell connected clients to re-query the tool list.
    async fn notify_tool_list_changed(&self) -> Result<()>;
}
