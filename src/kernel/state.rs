//! Enablement state: which tools are registered with the transport.
//!
//! One record per catalog tool, created disabled. `registered` and `enabled`
//! are always set together; there is no path that sets one without the other.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::tools::ToolCatalog;
use crate::types::{Error, Result};

/// Per-tool enablement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnablementRecord {
    pub tool_name: String,
    pub registered: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_at: Option<DateTime<Utc>>,
}

impl EnablementRecord {
    fn disabled(tool_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            registered: false,
            enabled: false,
            enabled_at: None,
        }
    }
}

/// Immutable copy of the enablement table.
#[derive(Debug, Clone, Default)]
pub struct EnablementSnapshot {
    records: HashMap<String, EnablementRecord>,
}

impl EnablementSnapshot {
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        self.records.get(tool_name).is_some_and(|r| r.enabled)
    }

    /// True iff every listed tool is enabled. Empty input is not enabled.
    pub fn all_enabled(&self, tool_names: &[String]) -> bool {
        !tool_names.is_empty() && tool_names.iter().all(|name| self.is_enabled(name))
    }

    pub fn get(&self, tool_name: &str) -> Option<&EnablementRecord> {
        self.records.get(tool_name)
    }

    /// Enabled tool names, sorted.
    pub fn enabled_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .values()
            .filter(|r| r.enabled)
            .map(|r| r.tool_name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Process-wide enablement table.
#[derive(Debug, Default)]
pub struct EnablementState {
    records: RwLock<HashMap<String, EnablementRecord>>,
}

impl EnablementState {
    /// One disabled record per catalog tool.
    pub fn new(catalog: &ToolCatalog) -> Self {
        let records = catalog
            .iter()
            .map(|d| (d.name().to_string(), EnablementRecord::disabled(d.name())))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// False for unknown or never-enabled tools.
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        self.records
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(tool_name)
            .is_some_and(|r| r.enabled)
    }

    /// Set `registered = enabled = true`. Returns whether the record changed.
    pub fn mark_enabled(&self, tool_name: &str) -> Result<bool> {
        let mut records = self.records.write().unwrap_or_else(|err| err.into_inner());
        let record = records
            .get_mut(tool_name)
            .ok_or_else(|| Error::unknown_tool(tool_name))?;
        if record.enabled {
            return Ok(false);
        }
        record.registered = true;
        record.enabled = true;
        record.enabled_at = Some(Utc::now());
        Ok(true)
    }

    pub fn snapshot(&self) -> EnablementSnapshot {
        EnablementSnapshot {
            records: self
                .records
                .read()
                .unwrap_or_else(|err| err.into_inner())
                .clone(),
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .filter(|r| r.enabled)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{static_exec, ToolConfig, ToolDescriptor};

    fn state() -> EnablementState {
        let catalog = ToolCatalog::from_descriptors(
            ["run_soql_query", "deploy_metadata"]
                .map(|n| ToolDescriptor::new(n, ["data"], ToolConfig::new(n), static_exec(n))),
            false,
        )
        .unwrap();
        EnablementState::new(&catalog)
    }

    #[test]
    fn test_starts_disabled() {
        let state = state();
        assert!(!state.is_enabled("run_soql_query"));
        assert!(!state.is_enabled("unknown"));
        assert_eq!(state.enabled_count(), 0);
    }

    #[test]
    fn test_mark_enabled_sets_both_flags() {
        let state = state();
        assert!(state.mark_enabled("run_soql_query").unwrap());
        assert!(state.is_enabled("run_soql_query"));

        let snapshot = state.snapshot();
        let record = snapshot.get("run_soql_query").unwrap();
        assert!(record.registered && record.enabled);
        assert!(record.enabled_at.is_some());
    }

    #[test]
    fn test_mark_enabled_twice_reports_no_change() {
        let state = state();
        assert!(state.mark_enabled("deploy_metadata").unwrap());
        assert!(!state.mark_enabled("deploy_metadata").unwrap());
        assert_eq!(state.enabled_count(), 1);
    }

    #[test]
    fn test_mark_unknown_fails() {
        let state = state();
        assert!(matches!(state.mark_enabled("nope"), Err(Error::UnknownTool(_))));
        assert_eq!(state.enabled_count(), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let state = state();
        let before = state.snapshot();
        state.mark_enabled("run_soql_query").unwrap();

        assert!(!before.is_enabled("run_soql_query"));
        assert!(state.snapshot().is_enabled("run_soql_query"));
    }

    #[test]
    fn test_all_enabled() {
        let state = state();
        let members = vec!["run_soql_query".to_string(), "deploy_metadata".to_string()];
        state.mark_enabled("run_soql_query").unwrap();
        assert!(!state.snapshot().all_enabled(&members));
        state.mark_enabled("deploy_metadata").unwrap();
        assert!(state.snapshot().all_enabled(&members));
        assert!(!state.snapshot().all_enabled(&[]));
        assert_eq!(state.snapshot().enabled_tools(), ["deploy_metadata", "run_soql_query"]);
    }
}
