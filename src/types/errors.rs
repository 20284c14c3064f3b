//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC: invalid request.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: invalid params.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC: internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// JSON-RPC: parse error.
pub const PARSE_ERROR: i64 = -32700;

/// Main error enum for the MCP server.
#[derive(Error, Debug)]
pub enum Error {
    /// No tool descriptor exists under this name (or it is not invocable).
    #[error("tool {0} does not exist")]
    UnknownTool(String),

    /// No toolset exists under this name.
    #[error("unknown toolset: {0}")]
    UnknownToolset(String),

    /// The transport rejected a registration. Indicates a broken
    /// single-registration invariant; never retried.
    #[error("transport registration failed for {tool}: {reason}")]
    TransportRegistration { tool: String, reason: String },

    /// Validation errors (map to JSON-RPC INVALID_PARAMS).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown JSON-RPC method (maps to METHOD_NOT_FOUND).
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal errors (map to JSON-RPC INTERNAL_ERROR).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_error_code(&self) -> i64 {
        match self {
            Error::UnknownTool(_) | Error::UnknownToolset(_) | Error::Validation(_) => {
                INVALID_PARAMS
            }
            Error::NotFound(_) => METHOD_NOT_FOUND,
            Error::Serialization(_) => PARSE_ERROR,
            Error::TransportRegistration { .. } | Error::Internal(_) | Error::Io(_) => {
                INTERNAL_ERROR
            }
        }
    }

    /// Whether this error signals a broken core invariant rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::TransportRegistration { .. })
    }
}

// Convenience constructors
impl Error {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn unknown_toolset(name: impl Into<String>) -> Self {
        Self::UnknownToolset(name.into())
    }

    pub fn transport_registration(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransportRegistration {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
