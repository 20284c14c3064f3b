//! # Salesforce MCP - dynamic tool enablement for an MCP server
//!
//! Exposes Salesforce CLI operations as MCP tools grouped into toolsets,
//! with tools turned on at startup or at runtime by the agent:
//! - Tool catalog and toolset registry built once from a tool provider
//! - Enablement state: which tools are registered with the transport
//! - Activation engine: at-most-once registration, one list-changed
//!   notification per request
//! - Listing service and the agent-facing discovery tools
//! - Stdio JSON-RPC adapter and a command-backed Salesforce CLI provider
//!
//! ## Architecture
//!
//! ```text
//!   enable_tools / enable_toolset
//!              │
//!              ▼
//!   ┌────────────────────┐   register    ┌──────────────────┐
//!   │  ActivationEngine  │ ────────────► │ ServerTransport  │
//!   │  (activation lock) │   notify      │  (StdioTransport)│
//!   └─────────┬──────────┘ ────────────► └──────────────────┘
//!             │ mark_enabled
//!             ▼
//!   ┌────────────────────┐   snapshot    ┌──────────────────┐
//!   │  EnablementState   │ ◄──────────── │  ListingService  │
//!   └────────────────────┘               └──────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod discovery;
pub mod kernel;
pub mod mcp;
pub mod tools;
pub mod transport;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
