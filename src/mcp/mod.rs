//! MCP over stdio: line-delimited JSON-RPC 2.0.
//!
//! [`StdioTransport`] is the live [`ServerTransport`](crate::transport::ServerTransport);
//! [`McpServer`] drives the session. Logging must go to stderr because
//! stdout carries the protocol.

pub mod codec;
pub mod server;
pub mod stdio;

pub use server::McpServer;
pub use stdio::{StdioTransport, TOOLS_LIST_CHANGED};
