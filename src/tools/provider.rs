//! Tool provider seam: where descriptors come from.

use crate::tools::ToolDescriptor;
use crate::types::Result;
use std::collections::HashMap;
use std::fmt;

/// Supplies tool descriptors. Enumerated once at startup.
pub trait ToolProvider: Send + Sync {
    /// Every tool this provider offers.
    fn enumerate(&self) -> Result<Vec<ToolDescriptor>>;

    /// Human-readable descriptions keyed by toolset name.
    fn toolset_descriptions(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Fixed list of descriptors.
#[derive(Debug, Default)]
pub struct StaticProvider {
    tools: Vec<ToolDescriptor>,
    descriptions: HashMap<String, String>,
}

impl StaticProvider {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            descriptions: HashMap::new(),
        }
    }

    pub fn with_toolset_description(
        mut self,
        toolset: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions.insert(toolset.into(), description.into());
        self
    }
}

impl ToolProvider for StaticProvider {
    fn enumerate(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    fn toolset_descriptions(&self) -> HashMap<String, String> {
        self.descriptions.clone()
    }
}

/// Concatenates several providers in order. Earlier providers win on
/// conflicting toolset descriptions; duplicate tool names are rejected by
/// the catalog.
#[derive(Default)]
pub struct CompositeProvider {
    providers: Vec<Box<dyn ToolProvider>>,
}

impl CompositeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl ToolProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for CompositeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl ToolProvider for CompositeProvider {
    fn enumerate(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        for provider in &self.providers {
            tools.extend(provider.enumerate()?);
        }
        Ok(tools)
    }

    fn toolset_descriptions(&self) -> HashMap<String, String> {
        let mut descriptions = HashMap::new();
        for provider in &self.providers {
            for (toolset, description) in provider.toolset_descriptions() {
                descriptions.entry(toolset).or_insert(description);
            }
        }
        descriptions
    }
}
