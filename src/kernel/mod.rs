//! Kernel - owns the catalog, toolset registry, enablement state, and the
//! activation engine, and gates tool invocation on enablement.
//!
//! Everything here is built once at startup and shared through `Arc`.
//! Subsystems are plain structs owned by the kernel, not separate actors.

pub mod activation;
pub mod listing;
pub mod state;

pub use activation::{
    ActivationEngine, ActivationOutcome, ActivationReport, ToolActivation, ToolsetActivation,
    CORE_TOOLSET, DYNAMIC_TOOLSET,
};
pub use listing::{ListingService, ToolListing, ToolsetListing};
pub use state::{EnablementRecord, EnablementSnapshot, EnablementState};

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::{ToolCatalog, ToolProvider, ToolResult, ToolsetRegistry};
use crate::transport::ServerTransport;
use crate::types::{Error, Result};

/// Process-wide tool kernel.
#[derive(Debug)]
pub struct Kernel {
    catalog: Arc<ToolCatalog>,
    toolsets: Arc<ToolsetRegistry>,
    state: Arc<EnablementState>,
    engine: ActivationEngine,
    listing: ListingService,
}

impl Kernel {
    /// Wire the subsystems around a finished catalog. All tools start disabled.
    pub fn new(
        catalog: ToolCatalog,
        toolset_descriptions: &HashMap<String, String>,
        transport: Arc<dyn ServerTransport>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let toolsets = Arc::new(ToolsetRegistry::build(&catalog, toolset_descriptions));
        let state = Arc::new(EnablementState::new(&catalog));
        let engine = ActivationEngine::new(
            catalog.clone(),
            toolsets.clone(),
            state.clone(),
            transport,
        );
        let listing = ListingService::new(catalog.clone(), toolsets.clone(), state.clone());

        tracing::debug!(
            tools = catalog.len(),
            toolsets = toolsets.len(),
            "kernel initialized"
        );
        Self {
            catalog,
            toolsets,
            state,
            engine,
            listing,
        }
    }

    /// Enumerate the provider once and build the kernel from it.
    pub fn from_provider(
        provider: &dyn ToolProvider,
        transport: Arc<dyn ServerTransport>,
        allow_non_ga_tools: bool,
    ) -> Result<Self> {
        let catalog = ToolCatalog::from_provider(provider, allow_non_ga_tools)?;
        Ok(Self::new(
            catalog,
            &provider.toolset_descriptions(),
            transport,
        ))
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn toolsets(&self) -> &ToolsetRegistry {
        &self.toolsets
    }

    pub fn state(&self) -> &EnablementState {
        &self.state
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    pub fn listing(&self) -> &ListingService {
        &self.listing
    }

    /// Invoke an enabled tool.
    ///
    /// Disabled and unknown tools are both `UnknownTool`: a client can only
    /// call what it has been shown. Arguments must satisfy the tool's input
    /// schema; a missing argument object is treated as `{}`.
    pub async fn call_tool(self: &Arc<Self>, name: &str, arguments: Value) -> Result<ToolResult> {
        let descriptor = self.catalog.require(name)?.clone();
        if !self.state.is_enabled(name) {
            return Err(Error::unknown_tool(name));
        }

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        self.catalog.validate_arguments(name, &arguments)?;

        tracing::debug!(tool = name, "invoking tool");
        descriptor
            .invoke(ToolContext::new(self.clone()), arguments)
            .await
    }
}

/// Handle given to tool exec callbacks.
#[derive(Debug, Clone)]
pub struct ToolContext {
    kernel: Arc<Kernel>,
}

impl ToolContext {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn engine(&self) -> &ActivationEngine {
        self.kernel.engine()
    }

    pub fn listing(&self) -> &ListingService {
        self.kernel.listing()
    }
}
