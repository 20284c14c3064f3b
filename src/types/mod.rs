//! Core types for the MCP server.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the server, toolsets, and provider

mod config;
mod errors;

pub use config::{
    split_list, Config, ObservabilityConfig, ProviderConfig, ServerConfig, ToolsetConfig,
    ALL_TOOLSETS,
};
pub use errors::{
    Error, Result, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
