//! Tool infrastructure: descriptors, catalog, toolset registry, providers.
//!
//! The catalog and toolset registry are fixed once the provider has been
//! enumerated at startup. Runtime enablement lives in [`crate::kernel`].

pub mod catalog;
pub mod command;
pub mod descriptor;
pub mod provider;
pub mod registry;

pub use catalog::{InputValidator, ToolCatalog};
pub use command::{CommandArg, CommandProvider, Manifest};
pub use descriptor::{
    empty_object_schema, exec_fn, static_exec, Content, ReleaseState, ToolAnnotations,
    ToolConfig, ToolDefinition, ToolDescriptor, ToolExec, ToolResult,
};
pub use provider::{CompositeProvider, StaticProvider, ToolProvider};
pub use registry::{ToolsetInfo, ToolsetRegistry};
