//! Salesforce MCP server - stdio entry point.
//!
//! ```bash
//! sf-mcp-server [--config <file>] [--toolsets <a,b,...>] [--dynamic-tools]
//!               [--allow-non-ga-tools] [--manifest <file>]
//! ```
//!
//! JSON-RPC goes over stdin/stdout; logs go to stderr.

use clap::Parser;
use std::path::PathBuf;

use salesforce_mcp::mcp::McpServer;
use salesforce_mcp::types::split_list;
use salesforce_mcp::Config;

/// MCP server exposing Salesforce CLI tools
#[derive(Debug, Parser)]
#[command(name = "sf-mcp-server")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(long, env = "SF_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated toolsets to enable at startup, or "all"
    #[arg(long)]
    toolsets: Option<String>,

    /// Expose discovery tools so the agent can enable tools at runtime
    #[arg(long)]
    dynamic_tools: bool,

    /// Include tools that are not generally available
    #[arg(long)]
    allow_non_ga_tools: bool,

    /// Tool manifest replacing the built-in Salesforce catalog
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> salesforce_mcp::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();

        if let Some(toolsets) = &self.toolsets {
            config.toolsets.enabled = split_list(toolsets);
        }
        if self.dynamic_tools {
            config.toolsets.dynamic_tools = true;
        }
        if self.allow_non_ga_tools {
            config.toolsets.allow_non_ga_tools = true;
        }
        if let Some(manifest) = self.manifest {
            config.provider.manifest = Some(manifest);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;
    salesforce_mcp::observability::init_tracing(&config.observability);

    tracing::info!(
        toolsets = ?config.toolsets.enabled,
        dynamic_tools = config.toolsets.dynamic_tools,
        allow_non_ga_tools = config.toolsets.allow_non_ga_tools,
        "starting sf-mcp-server"
    );

    let server = McpServer::from_config(&config).await?;
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c");
            cancel.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server.serve(stdin, tokio::io::stdout()).await?;
    Ok(())
}
