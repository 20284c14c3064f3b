//! Tool activation engine.
//!
//! Sole caller of [`ServerTransport::register`]. Every activation runs under
//! one async lock, so the "already enabled" check, the transport
//! registration, and the state update happen as a unit: two concurrent
//! requests for the same tool produce one registration and two successes.
//!
//! Each top-level request (one tool list or one toolset) sends at most one
//! `tools/list_changed` notification, after the lock is released and only
//! if something was activated. Notification failures are logged, never
//! reported as activation failures.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::kernel::EnablementState;
use crate::tools::{ToolCatalog, ToolsetRegistry};
use crate::transport::ServerTransport;
use crate::types::{Error, Result};

/// Toolset that is always enabled at startup.
pub const CORE_TOOLSET: &str = "core";

/// Toolset holding the discovery tools.
pub const DYNAMIC_TOOLSET: &str = "dynamic";

/// Successful result of enabling one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Registered with the transport by this call.
    Enabled,
    /// Was already enabled; nothing was registered.
    AlreadyEnabled,
}

/// Per-tool entry of an activation report.
#[derive(Debug)]
pub struct ToolActivation {
    pub tool: String,
    pub outcome: Result<ActivationOutcome>,
}

impl ToolActivation {
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn newly_enabled(&self) -> bool {
        matches!(self.outcome, Ok(ActivationOutcome::Enabled))
    }
}

/// Outcomes of one top-level request, in request order.
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub activations: Vec<ToolActivation>,
}

impl ActivationReport {
    /// No member failed. Already-enabled members count as success.
    pub fn is_success(&self) -> bool {
        !self.activations.iter().any(ToolActivation::is_failure)
    }

    /// At least one tool was newly registered.
    pub fn changed(&self) -> bool {
        self.activations.iter().any(ToolActivation::newly_enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.activations.iter().filter(|a| a.newly_enabled()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ToolActivation> {
        self.activations.iter().filter(|a| a.is_failure())
    }

    pub fn outcome_of(&self, tool: &str) -> Option<&Result<ActivationOutcome>> {
        self.activations
            .iter()
            .find(|a| a.tool == tool)
            .map(|a| &a.outcome)
    }
}

/// Result of enabling a toolset.
#[derive(Debug)]
pub enum ToolsetActivation {
    /// Every member was already enabled before the request.
    AlreadyEnabled,
    /// Members were activated; see the per-tool report.
    Activated(ActivationReport),
}

/// Enables tools and toolsets, registering each tool with the transport once.
pub struct ActivationEngine {
    catalog: Arc<ToolCatalog>,
    toolsets: Arc<ToolsetRegistry>,
    state: Arc<EnablementState>,
    transport: Arc<dyn ServerTransport>,
    /// Serializes check-register-mark across requests.
    activation_lock: Mutex<()>,
}

impl fmt::Debug for ActivationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationEngine")
            .field("tools", &self.catalog.len())
            .field("toolsets", &self.toolsets.len())
            .field("enabled", &self.state.enabled_count())
            .finish_non_exhaustive()
    }
}

impl ActivationEngine {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        toolsets: Arc<ToolsetRegistry>,
        state: Arc<EnablementState>,
        transport: Arc<dyn ServerTransport>,
    ) -> Self {
        Self {
            catalog,
            toolsets,
            state,
            transport,
            activation_lock: Mutex::new(()),
        }
    }

    /// Enable one tool. Idempotent; notifies only when newly enabled.
    pub async fn enable_tool(&self, name: &str) -> Result<ActivationOutcome> {
        let outcome = {
            let _guard = self.activation_lock.lock().await;
            self.activate_locked(name).await
        };
        if matches!(outcome, Ok(ActivationOutcome::Enabled)) {
            self.notify_list_changed().await;
        }
        outcome
    }

    /// Enable several tools as one request. Continues past failures and
    /// notifies once if anything was activated.
    pub async fn enable_tools(&self, names: &[String]) -> ActivationReport {
        let report = self.activate_batch(names).await;
        if report.changed() {
            self.notify_list_changed().await;
        }
        report
    }

    /// Enable every member of a toolset.
    ///
    /// Unknown toolsets fail with `UnknownToolset` before any state is
    /// touched. A fully enabled toolset returns `AlreadyEnabled` without
    /// notifying.
    pub async fn enable_toolset(&self, toolset: &str) -> Result<ToolsetActivation> {
        let members = self.toolsets.members_of(toolset)?.to_vec();

        let activation = {
            let _guard = self.activation_lock.lock().await;
            if self.state.snapshot().all_enabled(&members) {
                tracing::debug!(toolset, "toolset already enabled");
                return Ok(ToolsetActivation::AlreadyEnabled);
            }
            self.activate_members_locked(&members).await
        };

        tracing::info!(
            toolset,
            enabled = activation.enabled_count(),
            failed = activation.failures().count(),
            "toolset activated"
        );
        if activation.changed() {
            self.notify_list_changed().await;
        }
        Ok(ToolsetActivation::Activated(activation))
    }

    /// Startup activation: `core`, `dynamic`, and the requested toolsets
    /// (`None` meaning all of them). Sends no notification; no client is
    /// attached yet. Unknown toolsets are logged and skipped.
    pub async fn bootstrap(&self, requested: Option<Vec<String>>) -> ActivationReport {
        let mut toolsets: Vec<String> = Vec::new();
        for name in [CORE_TOOLSET, DYNAMIC_TOOLSET] {
            if self.toolsets.contains(name) {
                toolsets.push(name.to_string());
            }
        }
        match requested {
            None => toolsets.extend(self.toolsets.names()),
            Some(names) => {
                for name in names {
                    if self.toolsets.contains(&name) {
                        toolsets.push(name);
                    } else {
                        tracing::warn!(toolset = %name, "ignoring unknown startup toolset");
                    }
                }
            }
        }

        let mut members: Vec<String> = Vec::new();
        for toolset in &toolsets {
            for member in self.toolsets.members_of(toolset).unwrap_or_default() {
                if !members.contains(member) {
                    members.push(member.clone());
                }
            }
        }

        let report = self.activate_batch(&members).await;
        tracing::info!(
            toolsets = ?toolsets,
            enabled = report.enabled_count(),
            "startup toolsets enabled"
        );
        report
    }

    /// Whether a tool is currently enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.state.is_enabled(name)
    }

    async fn activate_batch(&self, names: &[String]) -> ActivationReport {
        let _guard = self.activation_lock.lock().await;
        self.activate_members_locked(names).await
    }

    async fn activate_members_locked(&self, names: &[String]) -> ActivationReport {
        let mut report = ActivationReport::default();
        for name in names {
            let outcome = self.activate_locked(name).await;
            report.activations.push(ToolActivation {
                tool: name.clone(),
                outcome,
            });
        }
        report
    }

    /// Must be called with `activation_lock` held.
    async fn activate_locked(&self, name: &str) -> Result<ActivationOutcome> {
        let descriptor = self.catalog.require(name)?.clone();
        if self.state.is_enabled(name) {
            tracing::debug!(tool = name, "tool already enabled");
            return Ok(ActivationOutcome::AlreadyEnabled);
        }

        if let Err(err) = self.transport.register(descriptor).await {
            tracing::error!(tool = name, error = %err, "transport rejected tool registration");
            return Err(match err {
                Error::TransportRegistration { .. } => err,
                other => Error::transport_registration(name, other.to_string()),
            });
        }
        self.state.mark_enabled(name)?;
        tracing::info!(tool = name, "tool enabled");
        Ok(ActivationOutcome::Enabled)
    }

    async fn notify_list_changed(&self) {
        if let Err(err) = self.transport.notify_tool_list_changed().await {
            tracing::warn!(error = %err, "failed to send tools/list_changed notification");
        }
    }
}
