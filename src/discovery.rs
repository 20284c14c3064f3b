//! Agent-facing discovery tools.
//!
//! Ordinary descriptors in the `dynamic` toolset that let a client list
//! what exists and turn tools on at runtime. They reach the activation
//! engine and listing service through [`ToolContext`].

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::kernel::{
    ActivationOutcome, ActivationReport, ToolContext, ToolsetActivation, DYNAMIC_TOOLSET,
};
use crate::tools::{exec_fn, ToolAnnotations, ToolConfig, ToolDescriptor, ToolProvider, ToolResult};
use crate::types::{Error, Result};

pub const ENABLE_TOOLS: &str = "enable_tools";
pub const ENABLE_TOOLSET: &str = "enable_toolset";
pub const LIST_TOOLS: &str = "list_tools";
pub const LIST_TOOLSETS: &str = "list_toolsets";
pub const LIST_AVAILABLE_TOOLSETS: &str = "list_available_toolsets";

const DYNAMIC_DESCRIPTION: &str =
    "Discover available tools and toolsets and enable them at runtime";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EnableToolsArgs {
    /// Names of the tools to enable.
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EnableToolsetArgs {
    /// Name of the toolset to enable.
    pub toolset: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Input schema generated from an argument type.
fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::validation(e.to_string()))
}

/// The discovery tools, all members of the `dynamic` toolset.
pub fn discovery_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ENABLE_TOOLS,
            [DYNAMIC_TOOLSET],
            ToolConfig::new(
                "Enable one or more tools by name. Use list_tools to see what is available.",
            )
            .with_title("Enable tools")
            .with_input_schema(schema_of::<EnableToolsArgs>()),
            exec_fn(enable_tools),
        ),
        ToolDescriptor::new(
            ENABLE_TOOLSET,
            [DYNAMIC_TOOLSET],
            ToolConfig::new(
                "Enable every tool in a toolset. Use list_available_toolsets to see the options.",
            )
            .with_title("Enable toolset")
            .with_input_schema(schema_of::<EnableToolsetArgs>()),
            exec_fn(enable_toolset),
        ),
        ToolDescriptor::new(
            LIST_TOOLS,
            [DYNAMIC_TOOLSET],
            ToolConfig::new("List every tool with its toolsets and whether it is enabled.")
                .with_title("List tools")
                .with_input_schema(schema_of::<NoArgs>())
                .with_annotations(ToolAnnotations::read_only()),
            exec_fn(|ctx: ToolContext, _args| async move {
                ToolResult::json(&ctx.listing().list_all_tools())
            }),
        ),
        ToolDescriptor::new(
            LIST_TOOLSETS,
            [DYNAMIC_TOOLSET],
            ToolConfig::new("List every toolset with its tools and whether it is enabled.")
                .with_title("List toolsets")
                .with_input_schema(schema_of::<NoArgs>())
                .with_annotations(ToolAnnotations::read_only()),
            exec_fn(|ctx: ToolContext, _args| async move {
                ToolResult::json(&ctx.listing().list_toolsets())
            }),
        ),
        ToolDescriptor::new(
            LIST_AVAILABLE_TOOLSETS,
            [DYNAMIC_TOOLSET],
            ToolConfig::new("Describe the available toolsets in plain text.")
                .with_title("List available toolsets")
                .with_input_schema(schema_of::<NoArgs>())
                .with_annotations(ToolAnnotations::read_only()),
            exec_fn(|ctx: ToolContext, _args| async move {
                Ok(ToolResult::text(render_available_toolsets(&ctx)))
            }),
        ),
    ]
}

async fn enable_tools(ctx: ToolContext, args: Value) -> Result<ToolResult> {
    let args: EnableToolsArgs = parse_args(args)?;
    let report = ctx.engine().enable_tools(&args.tools).await;
    Ok(render_tools_report(&report))
}

async fn enable_toolset(ctx: ToolContext, args: Value) -> Result<ToolResult> {
    let args: EnableToolsetArgs = parse_args(args)?;
    let activation = ctx.engine().enable_toolset(&args.toolset).await;
    Ok(render_toolset_activation(
        &args.toolset,
        activation,
        &ctx.listing().toolset_names(),
    ))
}

/// One line per requested tool. Flagged as an error only when nothing
/// in the request succeeded.
pub fn render_tools_report(report: &ActivationReport) -> ToolResult {
    let lines: Vec<String> = report
        .activations
        .iter()
        .map(|a| match &a.outcome {
            Ok(ActivationOutcome::Enabled) => format!("Tool {} enabled", a.tool),
            Ok(ActivationOutcome::AlreadyEnabled) => {
                format!("Tool {} is already enabled", a.tool)
            }
            Err(Error::UnknownTool(_)) => format!("Tool {} does not exist", a.tool),
            Err(err) => format!("Failed to enable tool {}: {err}", a.tool),
        })
        .collect();

    if report.activations.is_empty() {
        return ToolResult::error("No tools specified");
    }
    let text = lines.join("\n");
    if report.activations.iter().all(|a| a.is_failure()) {
        ToolResult::error(text)
    } else {
        ToolResult::text(text)
    }
}

pub fn render_toolset_activation(
    toolset: &str,
    activation: Result<ToolsetActivation>,
    available: &[String],
) -> ToolResult {
    match activation {
        Ok(ToolsetActivation::AlreadyEnabled) => {
            ToolResult::text(format!("Toolset {toolset} is already enabled"))
        }
        Ok(ToolsetActivation::Activated(report)) => {
            let mut lines = vec![format!("Toolset {toolset} enabled")];
            lines.extend(report.failures().filter_map(|a| {
                a.outcome
                    .as_ref()
                    .err()
                    .map(|err| format!("Failed to enable tool {}: {err}", a.tool))
            }));
            if report.is_success() {
                ToolResult::text(lines.join("\n"))
            } else {
                ToolResult::error(lines.join("\n"))
            }
        }
        Err(Error::UnknownToolset(_)) => ToolResult::error(format!(
            "Invalid toolset: {toolset}. Available: {}",
            available.join(", ")
        )),
        Err(err) => ToolResult::error(format!("Failed to enable toolset {toolset}: {err}")),
    }
}

fn render_available_toolsets(ctx: &ToolContext) -> String {
    let toolsets = ctx.listing().list_toolsets();
    let mut out = String::from("Available toolsets:");
    for toolset in toolsets {
        let status = if toolset.enabled { "enabled" } else { "disabled" };
        out.push_str(&format!(
            "\n- {} ({status}, {} tools): {}",
            toolset.name,
            toolset.tools.len(),
            toolset.description
        ));
    }
    out
}

/// Supplies the discovery tools and the `dynamic` toolset description.
#[derive(Debug, Default)]
pub struct DiscoveryProvider;

impl ToolProvider for DiscoveryProvider {
    fn enumerate(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(discovery_tools())
    }

    fn toolset_descriptions(&self) -> HashMap<String, String> {
        HashMap::from([(DYNAMIC_TOOLSET.to_string(), DYNAMIC_DESCRIPTION.to_string())])
    }
}
