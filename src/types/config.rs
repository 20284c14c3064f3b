//! Configuration structures.
//!
//! Configuration is loaded from defaults, an optional JSON config file, and
//! environment variables, in that order. CLI flags are applied last by the
//! binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Error, Result};

/// Toolset name that expands to every known toolset.
pub const ALL_TOOLSETS: &str = "all";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server identity reported on `initialize`.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Startup enablement.
    #[serde(default)]
    pub toolsets: ToolsetConfig,

    /// Command-backed tool provider.
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    /// Load a config file, filling unspecified sections with defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::validation(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply `SF_MCP_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(toolsets) = lookup("SF_MCP_TOOLSETS") {
            self.toolsets.enabled = split_list(&toolsets);
        }
        if let Some(flag) = lookup("SF_MCP_DYNAMIC_TOOLS") {
            self.toolsets.dynamic_tools = parse_flag(&flag);
        }
        if let Some(flag) = lookup("SF_MCP_ALLOW_NON_GA_TOOLS") {
            self.toolsets.allow_non_ga_tools = parse_flag(&flag);
        }
        if let Some(binary) = lookup("SF_MCP_SF_BINARY") {
            self.provider.sf_binary = binary;
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Server identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    pub name: String,

    /// Version reported in `serverInfo`.
    pub version: String,

    /// Optional instructions returned from `initialize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sf-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Which toolsets are enabled when the process starts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsetConfig {
    /// Toolsets to enable at startup. Empty means `all` unless
    /// `dynamic_tools` is set.
    #[serde(default)]
    pub enabled: Vec<String>,

    /// Expose the discovery tools and let the agent enable the rest.
    #[serde(default)]
    pub dynamic_tools: bool,

    /// Keep NON_GA tools in the catalog.
    #[serde(default)]
    pub allow_non_ga_tools: bool,
}

impl ToolsetConfig {
    /// Toolsets requested at startup, `None` meaning every toolset.
    pub fn startup_toolsets(&self) -> Option<Vec<String>> {
        if self.enabled.iter().any(|t| t == ALL_TOOLSETS) {
            return None;
        }
        if self.enabled.is_empty() && !self.dynamic_tools {
            return None;
        }
        Some(self.enabled.clone())
    }
}

/// Command-backed tool provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Tool manifest path. The embedded Salesforce manifest is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// Salesforce CLI executable.
    pub sf_binary: String,

    /// Upper bound on a single CLI invocation.
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            sf_binary: "sf".to_string(),
            command_timeout: Duration::from_secs(600),
        }
    }
}
