//! Tool descriptor: immutable metadata plus the provider-owned exec callback.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::kernel::ToolContext;
use crate::types::{Error, Result};

/// Callback that executes a tool. Owned by the tool provider; the core
/// never looks inside it.
pub type ToolExec =
    Arc<dyn Fn(ToolContext, Value) -> BoxFuture<'static, Result<ToolResult>> + Send + Sync>;

/// Release maturity of a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseState {
    #[default]
    Ga,
    NonGa,
}

/// Behavioural hints advertised to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    pub fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Presentation and schema metadata. Schemas are opaque JSON to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "ToolAnnotations::is_empty")]
    pub annotations: ToolAnnotations,
}

impl ToolConfig {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: description.into(),
            input_schema: empty_object_schema(),
            output_schema: None,
            annotations: ToolAnnotations::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Schema accepting any object.
pub fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result of a tool invocation, in MCP `CallToolResult` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Pretty-printed JSON as a single text block.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    /// All text blocks joined by newlines.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wire form of a tool as advertised in `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(flatten)]
    pub config: ToolConfig,
}

/// Immutable metadata for one tool plus its exec callback.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    toolsets: Vec<String>,
    release_state: ReleaseState,
    config: ToolConfig,
    exec: ToolExec,
}

impl ToolDescriptor {
    /// Build a GA descriptor. Duplicate toolset names are collapsed,
    /// keeping first-seen order.
    pub fn new<I, S>(
        name: impl Into<String>,
        toolsets: I,
        config: ToolConfig,
        exec: ToolExec,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members: Vec<String> = Vec::new();
        for toolset in toolsets {
            let toolset = toolset.into();
            if !members.contains(&toolset) {
                members.push(toolset);
            }
        }
        Self {
            name: name.into(),
            toolsets: members,
            release_state: ReleaseState::Ga,
            config,
            exec,
        }
    }

    pub fn with_release_state(mut self, release_state: ReleaseState) -> Self {
        self.release_state = release_state;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn toolsets(&self) -> &[String] {
        &self.toolsets
    }

    pub fn release_state(&self) -> ReleaseState {
        self.release_state
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            config: self.config.clone(),
        }
    }

    /// Run the exec callback.
    pub fn invoke(
        &self,
        ctx: ToolContext,
        arguments: Value,
    ) -> BoxFuture<'static, Result<ToolResult>> {
        (self.exec)(ctx, arguments)
    }

    /// Check the descriptor-level invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.toolsets.is_empty() {
            return Err(Error::validation(format!(
                "Tool {} must belong to at least one toolset",
                self.name
            )));
        }
        if self.toolsets.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::validation(format!(
                "Tool {} has an empty toolset name",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("toolsets", &self.toolsets)
            .field("release_state", &self.release_state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wrap an async function or closure as a [`ToolExec`].
pub fn exec_fn<F, Fut>(f: F) -> ToolExec
where
    F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    Arc::new(
        move |ctx: ToolContext, args: Value| -> BoxFuture<'static, Result<ToolResult>> {
            Box::pin(f(ctx, args))
        },
    )
}

/// Exec callback that returns a fixed text result.
pub fn static_exec(text: impl Into<String>) -> ToolExec {
    let text = text.into();
    exec_fn(move |_ctx, _args| {
        let text = text.clone();
        async move { Ok(ToolResult::text(text)) }
    })
}
