//! Server transport backed by the stdio session.
//!
//! Keeps the table of registered tools (what `tools/list` shows and
//! `tools/call` accepts) and queues list-changed notifications for the
//! server loop to write.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::mcp::codec::notification;
use crate::tools::{ToolDefinition, ToolDescriptor};
use crate::transport::ServerTransport;
use crate::types::{Error, Result};

pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

#[derive(Debug)]
pub struct StdioTransport {
    registered: RwLock<Vec<Arc<ToolDescriptor>>>,
    outbound: mpsc::UnboundedSender<Value>,
}

impl StdioTransport {
    /// Transport plus the receiving end of its outbound notification queue.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Value>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            registered: RwLock::new(Vec::new()),
            outbound,
        });
        (transport, rx)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .iter()
            .any(|d| d.name() == name)
    }

    /// Wire definitions of registered tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registered
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .iter()
            .map(|d| d.definition())
            .collect()
    }

    pub fn registered_count(&self) -> usize {
        self.registered
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }
}

#[async_trait]
impl ServerTransport for StdioTransport {
    async fn register(&self, descriptor: Arc<ToolDescriptor>) -> Result<()> {
        let mut registered = self
            .registered
            .write()
            .unwrap_or_else(|err| err.into_inner());
        if registered.iter().any(|d| d.name() == descriptor.name()) {
            return Err(Error::transport_registration(
                descriptor.name(),
                "tool is already registered",
            ));
        }
        tracing::debug!(tool = descriptor.name(), "tool registered with stdio transport");
        registered.push(descriptor);
        Ok(())
    }

    async fn notify_tool_list_changed(&self) -> Result<()> {
        self.outbound
            .send(notification(TOOLS_LIST_CHANGED))
            .map_err(|_| Error::internal("client connection closed"))
    }
}
