//! Observability utilities.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::ObservabilityConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Environment variable selecting the log format (`json` or plain).
pub const LOG_FORMAT_ENV: &str = "SF_MCP_LOG_FORMAT";

/// Initialize tracing subscriber once for the process.
///
/// Logs go to stderr; stdout carries the MCP stream. `RUST_LOG` takes
/// precedence over `config.log_level`. JSON output is enabled by
/// `config.json_logs` or `SF_MCP_LOG_FORMAT=json`.
pub fn init_tracing(config: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let json = config.json_logs || json_format_requested(std::env::var(LOG_FORMAT_ENV).ok());

        let result = if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

fn json_format_requested(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}
