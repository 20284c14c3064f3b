//! Command-backed tool provider.
//!
//! Each tool in the manifest maps to an argument template for the Salesforce
//! CLI. Exec renders the template from the tool input and runs the CLI with
//! `tokio::process`, bounded by the configured timeout.
//!
//! Template entries:
//! - `"data"`, `"--query"`, `"{query}"`: literal strings; `{field}` is
//!   replaced by the input field and the field is required.
//! - `{ "flag": "--target-org", "value": "usernameOrAlias" }`: emitted only
//!   when the field is present. `true` emits the flag alone; `false` and
//!   `null` omit it; arrays are joined with commas.

use crate::tools::{exec_fn, ReleaseState, ToolConfig, ToolDescriptor, ToolProvider, ToolResult};
use crate::types::{Error, ProviderConfig, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

/// Manifest shipped with the server.
pub const SALESFORCE_MANIFEST: &str = include_str!("../../catalog/salesforce.json");

// =============================================================================
// Manifest
// =============================================================================

/// Tool manifest: toolset descriptions plus command-backed tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub toolsets: Vec<ManifestToolset>,
    pub tools: Vec<ManifestTool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestToolset {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTool {
    pub name: String,
    pub toolsets: Vec<String>,
    #[serde(default)]
    pub release_state: ReleaseState,
    #[serde(flatten)]
    pub config: ToolConfig,
    pub command: Vec<CommandArg>,
}

/// One entry of a command template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandArg {
    Literal(String),
    Flag { flag: String, value: String },
}

impl Manifest {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::validation(format!("invalid tool manifest: {}", e)))
    }
}

// =============================================================================
// Template rendering
// =============================================================================

/// Render a command template against a tool input object.
pub fn render_args(template: &[CommandArg], input: &Value) -> Result<Vec<String>> {
    let mut args = Vec::with_capacity(template.len());
    for arg in template {
        match arg {
            CommandArg::Literal(text) => args.push(substitute(text, input)?),
            CommandArg::Flag { flag, value } => match input.get(value) {
                None | Some(Value::Null) | Some(Value::Bool(false)) => {}
                Some(Value::Bool(true)) => args.push(flag.clone()),
                Some(v) => {
                    args.push(flag.clone());
                    args.push(format_value(v));
                }
            },
        }
    }
    Ok(args)
}

/// Replace `{field}` placeholders. Braces not enclosing an identifier are
/// kept verbatim.
fn substitute(text: &str, input: &Value) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let field_end = after.find('}');
        match field_end {
            Some(end) if is_identifier(&after[..end]) => {
                let field = &after[..end];
                let value = input
                    .get(field)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| Error::validation(format!("Missing required argument: {}", field)))?;
                out.push_str(&format_value(value));
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(format_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Provider that turns manifest entries into CLI-backed tools.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    manifest: Manifest,
    binary: String,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(manifest: Manifest, binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            manifest,
            binary: binary.into(),
            timeout,
        }
    }

    /// Use the manifest named in config, or the embedded one.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let manifest = match &config.manifest {
            Some(path) => load_manifest(path)?,
            None => Manifest::parse(SALESFORCE_MANIFEST)?,
        };
        Ok(Self::new(manifest, config.sf_binary.clone(), config.command_timeout))
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = std::fs::read_to_string(path)?;
    Manifest::parse(&raw)
}

impl ToolProvider for CommandProvider {
    fn enumerate(&self) -> Result<Vec<ToolDescriptor>> {
        let descriptors = self
            .manifest
            .tools
            .iter()
            .map(|tool| {
                let spec = Arc::new(CommandSpec {
                    tool: tool.name.clone(),
                    binary: self.binary.clone(),
                    template: tool.command.clone(),
                    timeout: self.timeout,
                });
                let exec = exec_fn(move |_ctx, input| {
                    let spec = spec.clone();
                    async move { spec.run(input).await }
                });
                ToolDescriptor::new(&tool.name, &tool.toolsets, tool.config.clone(), exec)
                    .with_release_state(tool.release_state)
            })
            .collect();
        Ok(descriptors)
    }

    fn toolset_descriptions(&self) -> HashMap<String, String> {
        self.manifest
            .toolsets
            .iter()
            .map(|t| (t.name.clone(), t.description.clone()))
            .collect()
    }
}

/// Everything exec needs, captured once per tool.
#[derive(Debug)]
struct CommandSpec {
    tool: String,
    binary: String,
    template: Vec<CommandArg>,
    timeout: Duration,
}

impl CommandSpec {
    async fn run(&self, input: Value) -> Result<ToolResult> {
        let args = render_args(&self.template, &input)?;
        tracing::debug!(tool = %self.tool, binary = %self.binary, ?args, "running command");

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_elapsed) => {
                tracing::warn!(tool = %self.tool, "command timed out after {:?}", self.timeout);
                return Ok(ToolResult::error(format!(
                    "{} timed out after {}s",
                    self.tool,
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %self.tool, "failed to spawn {}: {}", self.binary, e);
                return Ok(ToolResult::error(format!(
                    "Failed to run {}: {}",
                    self.binary, e
                )));
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(ToolResult::text(stdout));
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::info!(tool = %self.tool, status = %output.status, "command failed");
        Ok(ToolResult::error(if stderr.is_empty() { stdout } else { stderr }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn literal(s: &str) -> CommandArg {
        CommandArg::Literal(s.to_string())
    }

    fn flag(flag: &str, value: &str) -> CommandArg {
        CommandArg::Flag {
            flag: flag.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_render_literal_placeholders() {
        let template = vec![
            literal("data"),
            literal("query"),
            literal("--query"),
            literal("{query}"),
            literal("--target-org"),
            literal("{usernameOrAlias}"),
        ];
        let args = render_args(
            &template,
            &json!({"query": "SELECT Id FROM Account", "usernameOrAlias": "dev"}),
        )
        .unwrap();
        assert_eq!(
            args,
            ["data", "query", "--query", "SELECT Id FROM Account", "--target-org", "dev"]
        );
    }

    #[test]
    fn test_render_embedded_placeholder() {
        let args = render_args(
            &[literal("Status='{status}'")],
            &json!({"status": "In Review"}),
        )
        .unwrap();
        assert_eq!(args, ["Status='In Review'"]);
    }

    #[test]
    fn test_render_missing_required() {
        let err = render_args(&[literal("{query}")], &json!({})).unwrap_err();
        assert!(err.to_string().contains("Missing required argument: query"));
    }

    #[test]
    fn test_render_optional_flags() {
        let template = vec![
            flag("--dry-run", "dryRun"),
            flag("--wait", "wait"),
            flag("--metadata", "metadata"),
            flag("--test-level", "testLevel"),
        ];
        let args = render_args(
            &template,
            &json!({"dryRun": true, "wait": 33, "metadata": ["ApexClass", "CustomObject"], "testLevel": null}),
        )
        .unwrap();
        assert_eq!(
            args,
            ["--dry-run", "--wait", "33", "--metadata", "ApexClass,CustomObject"]
        );

        let none = render_args(&template, &json!({"dryRun": false})).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_non_identifier_braces_kept() {
        let args = render_args(&[literal("{ not a field }")], &json!({})).unwrap();
        assert_eq!(args, ["{ not a field }"]);
    }

    #[test]
    fn test_embedded_manifest_parses() {
        let manifest = Manifest::parse(SALESFORCE_MANIFEST).unwrap();
        assert!(manifest.tools.iter().any(|t| t.name == "run_soql_query"));
        assert!(manifest.tools.iter().any(|t| t.toolsets.iter().any(|s| s == "core")));
        assert!(manifest.toolsets.iter().any(|t| t.name == "devops"));
    }

    #[test]
    fn test_manifest_tool_fields() {
        let manifest = Manifest::parse(
            r#"{"tools": [{
                "name": "run_agent_test",
                "toolsets": ["testing"],
                "releaseState": "NON_GA",
                "description": "Run agent tests",
                "annotations": {"readOnlyHint": false},
                "command": ["agent", "test", "run", {"flag": "--api-name", "value": "apiName"}]
            }]}"#,
        )
        .unwrap();
        let tool = &manifest.tools[0];
        assert_eq!(tool.release_state, ReleaseState::NonGa);
        assert_eq!(tool.config.description, "Run agent tests");
        assert_eq!(tool.config.input_schema["type"], "object");
        assert_eq!(tool.command[3], flag("--api-name", "apiName"));
    }

    #[test]
    fn test_provider_enumerates_manifest() {
        let provider = CommandProvider::from_config(&ProviderConfig::default()).unwrap();
        let tools = provider.enumerate().unwrap();
        assert_eq!(tools.len(), provider.manifest().tools.len());
        assert!(provider.toolset_descriptions().contains_key("data"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_tool_error() {
        let spec = CommandSpec {
            tool: "get_username".to_string(),
            binary: "/nonexistent/sf-binary".to_string(),
            template: vec![literal("config"), literal("get"), literal("target-org")],
            timeout: Duration::from_secs(5),
        };
        let result = spec.run(json!({})).await.unwrap();
        assert!(result.is_error);
        assert!(result.text_content().starts_with("Failed to run /nonexistent/sf-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command_and_captures_stdout() {
        let spec = CommandSpec {
            tool: "echo".to_string(),
            binary: "echo".to_string(),
            template: vec![literal("hello {name}")],
            timeout: Duration::from_secs(5),
        };
        let result = spec.run(json!({"name": "world"})).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text_content(), "hello world");
    }
}
