//! Read-only queries over the catalog and enablement state.
//!
//! Every call takes one snapshot of the enablement table, so a single
//! listing never mixes states from before and after a concurrent activation.

use serde::Serialize;
use std::sync::Arc;

use crate::kernel::EnablementState;
use crate::tools::{ReleaseState, ToolCatalog, ToolsetRegistry};

/// One tool as shown to agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub release_state: ReleaseState,
    pub toolsets: Vec<String>,
}

/// One toolset with its derived enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsetListing {
    pub name: String,
    pub description: String,
    /// True iff every member tool is enabled.
    pub enabled: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListingService {
    catalog: Arc<ToolCatalog>,
    toolsets: Arc<ToolsetRegistry>,
    state: Arc<EnablementState>,
}

impl ListingService {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        toolsets: Arc<ToolsetRegistry>,
        state: Arc<EnablementState>,
    ) -> Self {
        Self {
            catalog,
            toolsets,
            state,
        }
    }

    /// Every catalog tool in enumeration order.
    pub fn list_all_tools(&self) -> Vec<ToolListing> {
        let snapshot = self.state.snapshot();
        self.catalog
            .iter()
            .map(|descriptor| ToolListing {
                name: descriptor.name().to_string(),
                description: descriptor.description().to_string(),
                enabled: snapshot.is_enabled(descriptor.name()),
                release_state: descriptor.release_state(),
                toolsets: descriptor.toolsets().to_vec(),
            })
            .collect()
    }

    /// Every toolset, ordered by name.
    pub fn list_toolsets(&self) -> Vec<ToolsetListing> {
        let snapshot = self.state.snapshot();
        self.toolsets
            .list_toolsets()
            .into_iter()
            .map(|info| ToolsetListing {
                name: info.name.clone(),
                description: info.description.clone(),
                enabled: snapshot.all_enabled(&info.members),
                tools: info.members.clone(),
            })
            .collect()
    }

    /// Names of enabled tools, sorted.
    pub fn enabled_tools(&self) -> Vec<String> {
        self.state.snapshot().enabled_tools()
    }

    /// Toolset names, ordered.
    pub fn toolset_names(&self) -> Vec<String> {
        self.toolsets.names()
    }
}
