//! Toolset registry: static toolset -> member tools mapping.
//!
//! Built once from the catalog by grouping descriptors on their declared
//! membership. A tool listed under several toolsets appears in each.

use crate::tools::ToolCatalog;
use crate::types::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One toolset and its fixed membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsetInfo {
    pub name: String,
    pub description: String,
    /// Member tool names in catalog enumeration order.
    pub members: Vec<String>,
}

/// Toolset name -> membership, ordered by name.
#[derive(Debug, Default)]
pub struct ToolsetRegistry {
    toolsets: BTreeMap<String, ToolsetInfo>,
}

impl ToolsetRegistry {
    /// Group the catalog's tools by toolset. `descriptions` supplies the
    /// human-readable text; toolsets without one get an empty description.
    pub fn build(catalog: &ToolCatalog, descriptions: &HashMap<String, String>) -> Self {
        let mut toolsets: BTreeMap<String, ToolsetInfo> = BTreeMap::new();
        for descriptor in catalog.iter() {
            for toolset in descriptor.toolsets() {
                toolsets
                    .entry(toolset.clone())
                    .or_insert_with(|| ToolsetInfo {
                        name: toolset.clone(),
                        description: descriptions.get(toolset).cloned().unwrap_or_default(),
                        members: Vec::new(),
                    })
                    .members
                    .push(descriptor.name().to_string());
            }
        }
        Self { toolsets }
    }

    /// All toolsets, ordered by name.
    pub fn list_toolsets(&self) -> Vec<&ToolsetInfo> {
        self.toolsets.values().collect()
    }

    /// Toolset names, ordered.
    pub fn names(&self) -> Vec<String> {
        self.toolsets.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolsetInfo> {
        self.toolsets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.toolsets.contains_key(name)
    }

    /// Member tool names, or `UnknownToolset`.
    pub fn members_of(&self, name: &str) -> Result<&[String]> {
        self.toolsets
            .get(name)
            .map(|info| info.members.as_slice())
            .ok_or_else(|| Error::unknown_toolset(name))
    }

    pub fn len(&self) -> usize {
        self.toolsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolsets.is_empty()
    }
}
