//! Activation integration tests: provider → kernel → transport, using the
//! built-in Salesforce manifest and a recording transport.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use salesforce_mcp::discovery::{DiscoveryProvider, ENABLE_TOOLS, ENABLE_TOOLSET};
use salesforce_mcp::kernel::{ActivationOutcome, Kernel, ToolsetActivation};
use salesforce_mcp::tools::{
    CommandProvider, CompositeProvider, ReleaseState, ToolDescriptor, ToolProvider,
};
use salesforce_mcp::transport::ServerTransport;
use salesforce_mcp::types::{Error, ProviderConfig, Result};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records registrations and notifications; can be told to fail notifying
/// or to reject one tool's registration.
#[derive(Debug, Default)]
struct RecordingTransport {
    registered: Mutex<Vec<String>>,
    notifications: AtomicUsize,
    fail_notify: AtomicBool,
    register_delay: Option<Duration>,
    reject: Option<&'static str>,
}

impl RecordingTransport {
    fn registrations_of(&self, name: &str) -> usize {
        self.registered
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    fn registration_count(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerTransport for RecordingTransport {
    async fn register(&self, descriptor: Arc<ToolDescriptor>) -> Result<()> {
        if let Some(delay) = self.register_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject == Some(descriptor.name()) {
            return Err(Error::transport_registration(descriptor.name(), "rejected"));
        }
        let mut registered = self.registered.lock().unwrap();
        if registered.iter().any(|n| n == descriptor.name()) {
            return Err(Error::transport_registration(descriptor.name(), "duplicate"));
        }
        registered.push(descriptor.name().to_string());
        Ok(())
    }

    async fn notify_tool_list_changed(&self) -> Result<()> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(Error::internal("client went away"));
        }
        Ok(())
    }
}

fn provider(dynamic: bool) -> CompositeProvider {
    let command = CommandProvider::from_config(&ProviderConfig::default()).unwrap();
    let provider = CompositeProvider::new().with(command);
    if dynamic {
        provider.with(DiscoveryProvider)
    } else {
        provider
    }
}

/// Kernel over the Salesforce manifest with only startup tools enabled.
async fn fresh(transport: Arc<RecordingTransport>) -> Arc<Kernel> {
    let kernel = Kernel::from_provider(&provider(true), transport, false).unwrap();
    kernel.engine().bootstrap(Some(Vec::new())).await;
    Arc::new(kernel)
}

#[tokio::test]
async fn test_fresh_process_enables_core_and_discovery_only() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;

    let enabled = kernel.listing().enabled_tools();
    assert_eq!(
        enabled,
        [
            "enable_tools",
            "enable_toolset",
            "get_username",
            "list_available_toolsets",
            "list_tools",
            "list_toolsets",
            "resume_tool_operation",
        ]
    );
    assert_eq!(transport.notifications(), 0);
}

#[tokio::test]
async fn test_enable_tools_reports_and_notifies_once() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;

    let result = kernel
        .call_tool(
            ENABLE_TOOLS,
            json!({ "tools": ["run_soql_query", "deploy_metadata"] }),
        )
        .await
        .unwrap();

    assert_eq!(
        result.text_content(),
        "Tool run_soql_query enabled\nTool deploy_metadata enabled"
    );
    assert_eq!(transport.notifications(), 1);
    assert!(kernel.engine().is_enabled("run_soql_query"));
    assert!(kernel.engine().is_enabled("deploy_metadata"));
}

#[tokio::test]
async fn test_enable_toolset_twice_notifies_once() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;

    let first = kernel
        .call_tool(ENABLE_TOOLSET, json!({ "toolset": "devops" }))
        .await
        .unwrap();
    assert_eq!(first.text_content(), "Toolset devops enabled");
    assert_eq!(transport.notifications(), 1);

    let second = kernel
        .call_tool(ENABLE_TOOLSET, json!({ "toolset": "devops" }))
        .await
        .unwrap();
    assert_eq!(second.text_content(), "Toolset devops is already enabled");
    assert_eq!(transport.notifications(), 1);
}

#[tokio::test]
async fn test_enable_toolset_enables_every_member() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;

    let members = kernel.toolsets().members_of("orgs").unwrap().to_vec();
    assert!(!members.is_empty());
    let activation = kernel.engine().enable_toolset("orgs").await.unwrap();
    assert!(matches!(activation, ToolsetActivation::Activated(ref r) if r.is_success()));
    for member in &members {
        assert!(kernel.engine().is_enabled(member), "{member} not enabled");
        assert_eq!(transport.registrations_of(member), 1);
    }
}

#[tokio::test]
async fn test_enable_toolset_reports_failed_member_and_enables_the_rest() {
    let transport = Arc::new(RecordingTransport {
        reject: Some("deploy_metadata"),
        ..Default::default()
    });
    let kernel = fresh(transport.clone()).await;
    let members = kernel.toolsets().members_of("metadata").unwrap().to_vec();
    assert!(members.len() > 1);

    let result = kernel
        .call_tool(ENABLE_TOOLSET, json!({ "toolset": "metadata" }))
        .await
        .unwrap();

    assert!(result.is_error);
    assert_eq!(
        result.text_content(),
        "Toolset metadata enabled\nFailed to enable tool deploy_metadata: \
         transport registration failed for deploy_metadata: rejected"
    );
    for member in members.iter().filter(|m| m.as_str() != "deploy_metadata") {
        assert!(kernel.engine().is_enabled(member), "{member} not enabled");
    }
    assert!(!kernel.engine().is_enabled("deploy_metadata"));
    assert_eq!(transport.notifications(), 1);
}

#[tokio::test]
async fn test_unknown_toolset_mutates_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;
    let before = kernel.listing().list_all_tools();
    let registrations = transport.registration_count();

    let err = kernel.engine().enable_toolset("nonexistent").await.unwrap_err();
    assert!(matches!(err, Error::UnknownToolset(_)));
    assert_eq!(kernel.listing().list_all_tools(), before);
    assert_eq!(transport.registration_count(), registrations);

    let result = kernel
        .call_tool(ENABLE_TOOLSET, json!({ "toolset": "nonexistent" }))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result
        .text_content()
        .starts_with("Invalid toolset: nonexistent. Available: code-analysis, core, data, devops,"));
}

#[tokio::test]
async fn test_unknown_tool_never_registers() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;
    let registrations = transport.registration_count();

    let err = kernel.engine().enable_tool("nonexistent").await.unwrap_err();
    assert!(matches!(err, Error::UnknownTool(_)));
    assert_eq!(transport.registration_count(), registrations);
    assert_eq!(transport.notifications(), 0);
}

#[tokio::test]
async fn test_listing_reflects_enablement() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport).await;
    let enabled = |kernel: &Kernel, name: &str| {
        kernel
            .listing()
            .list_all_tools()
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.enabled)
    };

    assert_eq!(enabled(&kernel, "run_soql_query"), Some(false));
    kernel.engine().enable_tool("run_soql_query").await.unwrap();
    assert_eq!(enabled(&kernel, "run_soql_query"), Some(true));
}

#[tokio::test]
async fn test_shared_tool_not_reregistered_across_toolsets() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = fresh(transport.clone()).await;

    let shared = kernel
        .catalog()
        .iter()
        .find(|d| d.toolsets().len() > 1)
        .map(|d| (d.name().to_string(), d.toolsets().to_vec()))
        .expect("manifest has a tool in several toolsets");

    kernel.engine().enable_toolset(&shared.1[0]).await.unwrap();
    let activation = kernel.engine().enable_toolset(&shared.1[1]).await.unwrap();
    if let ToolsetActivation::Activated(report) = activation {
        assert!(matches!(
            report.outcome_of(&shared.0),
            Some(Ok(ActivationOutcome::AlreadyEnabled))
        ));
    }
    assert_eq!(transport.registrations_of(&shared.0), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enables_register_once() {
    let transport = Arc::new(RecordingTransport {
        register_delay: Some(Duration::from_millis(20)),
        ..Default::default()
    });
    let kernel = fresh(transport.clone()).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let kernel = kernel.clone();
            tokio::spawn(async move { kernel.engine().enable_tool("run_soql_query").await })
        })
        .collect();

    let mut enabled = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            ActivationOutcome::Enabled => enabled += 1,
            ActivationOutcome::AlreadyEnabled => {}
        }
    }
    assert_eq!(enabled, 1);
    assert_eq!(transport.registrations_of("run_soql_query"), 1);
    assert_eq!(transport.notifications(), 1);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_notification_failure_is_logged_not_returned() {
    let transport = Arc::new(RecordingTransport::default());
    transport.fail_notify.store(true, Ordering::SeqCst);
    let kernel = fresh(transport.clone()).await;

    let outcome = kernel.engine().enable_tool("run_soql_query").await.unwrap();
    assert_eq!(outcome, ActivationOutcome::Enabled);
    assert_eq!(transport.notifications(), 1);
    assert!(logs_contain("failed to send tools/list_changed notification"));
}

#[tokio::test]
async fn test_non_ga_tools_hidden_unless_allowed() {
    let manifest = provider(false).enumerate().unwrap();
    let non_ga: Vec<String> = manifest
        .iter()
        .filter(|d| d.release_state() == ReleaseState::NonGa)
        .map(|d| d.name().to_string())
        .collect();
    assert!(!non_ga.is_empty());

    let transport = Arc::new(RecordingTransport::default());
    let hidden = Kernel::from_provider(&provider(false), transport.clone(), false).unwrap();
    let shown = Kernel::from_provider(&provider(false), transport, true).unwrap();
    for name in &non_ga {
        assert!(!hidden.catalog().has_tool(name));
        assert!(shown.catalog().has_tool(name));
        assert!(matches!(
            hidden.engine().enable_tool(name).await,
            Err(Error::UnknownTool(_))
        ));
    }
}

#[tokio::test]
async fn test_bootstrap_all_without_flags() {
    let transport = Arc::new(RecordingTransport::default());
    let kernel = Kernel::from_provider(&provider(false), transport.clone(), false).unwrap();

    let report = kernel.engine().bootstrap(None).await;
    assert!(report.is_success());
    assert_eq!(kernel.state().enabled_count(), kernel.catalog().len());
    assert_eq!(transport.registration_count(), kernel.catalog().len());
    assert_eq!(transport.notifications(), 0);
}

proptest! {
    /// Any sequence of enable requests registers each tool at most once,
    /// and everything requested that exists ends up enabled.
    #[test]
    fn prop_registration_is_at_most_once(picks in prop::collection::vec(0usize..24, 1..40)) {
        tokio_test::block_on(async {
            let transport = Arc::new(RecordingTransport::default());
            let kernel = fresh(transport.clone()).await;
            let mut names = kernel.catalog().list_names();
            names.push("nonexistent".to_string());

            let requested: Vec<String> = picks.iter().map(|i| names[i % names.len()].clone()).collect();
            for chunk in requested.chunks(3) {
                kernel.engine().enable_tools(chunk).await;
            }

            for name in kernel.catalog().list_names() {
                prop_assert!(transport.registrations_of(&name) <= 1);
            }
            for name in requested.iter().filter(|n| kernel.catalog().has_tool(n)) {
                prop_assert!(kernel.engine().is_enabled(name));
            }
            Ok(())
        })?;
    }
}
