//! Integration tests for catalog building and routing through the public API.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::sync::{Arc, Mutex};
use toolbridge::catalog::{build_catalog, ToolSource};
use toolbridge::sanitizer::SanitizerKind;
use toolbridge::tool_protocol::{
    probe_connection, ToolDescriptor, ToolError, ToolOutcome, ToolProtocol,
};

/// Provider that tags every answer with its own label, so tests can tell
/// which connection a call was routed to.
struct LabeledProtocol {
    label: String,
    tools: Vec<ToolDescriptor>,
    calls: Mutex<usize>,
}

impl LabeledProtocol {
    fn new(label: &str, tools: Vec<ToolDescriptor>) -> Self {
        Self {
            label: label.to_string(),
            tools,
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ToolProtocol for LabeledProtocol {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, Box<dyn Error + Send + Sync>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        _tool_name: &str,
        _arguments: JsonValue,
    ) -> Result<ToolOutcome, Box<dyn Error + Send + Sync>> {
        *self.calls.lock().unwrap() += 1;
        Ok(ToolOutcome::Value(json!({"answered_by": self.label})))
    }

    fn protocol_name(&self) -> &str {
        "labeled"
    }
}

struct UnlistableProtocol;

#[async_trait]
impl ToolProtocol for UnlistableProtocol {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, Box<dyn Error + Send + Sync>> {
        Err(Box::new(ToolError::CatalogUnavailable(
            "refused to enumerate".to_string(),
        )))
    }

    async fn call_tool(
        &self,
        _tool_name: &str,
        _arguments: JsonValue,
    ) -> Result<ToolOutcome, Box<dyn Error + Send + Sync>> {
        Ok(ToolOutcome::Value(JsonValue::Null))
    }

    fn protocol_name(&self) -> &str {
        "unlistable"
    }
}

#[tokio::test]
async fn colliding_names_route_to_the_later_provider() {
    let first = Arc::new(LabeledProtocol::new(
        "first",
        vec![ToolDescriptor::new("status")],
    ));
    let second = Arc::new(LabeledProtocol::new(
        "second",
        vec![ToolDescriptor::new("status")],
    ));
    let catalog = build_catalog(&[
        ToolSource::new("first", first.clone(), SanitizerKind::None),
        ToolSource::new("second", second.clone(), SanitizerKind::None),
    ])
    .await;

    let route = catalog.route("status").expect("status should be routable");
    let outcome = route
        .connection
        .call_tool("status", json!({}))
        .await
        .unwrap();

    assert_eq!(outcome, ToolOutcome::Value(json!({"answered_by": "second"})));
    assert_eq!(first.call_count(), 0);
    assert_eq!(second.call_count(), 1);
}

#[tokio::test]
async fn ordering_of_the_flat_catalog_follows_the_sources() {
    let git = Arc::new(LabeledProtocol::new(
        "git",
        vec![
            ToolDescriptor::new("git_status"),
            ToolDescriptor::new("git_add"),
        ],
    ));
    let files = Arc::new(LabeledProtocol::new(
        "files",
        vec![ToolDescriptor::new("read_file")],
    ));
    let catalog = build_catalog(&[
        ToolSource::new("git", git, SanitizerKind::VersionControl),
        ToolSource::new("files", files, SanitizerKind::Filesystem),
    ])
    .await;

    let names: Vec<&str> = catalog.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["git_status", "git_add", "read_file"]);
    assert_eq!(
        catalog.route("read_file").unwrap().sanitizer,
        SanitizerKind::Filesystem
    );
    assert_eq!(
        catalog.route("git_add").unwrap().sanitizer,
        SanitizerKind::VersionControl
    );
}

#[tokio::test]
async fn one_broken_provider_leaves_the_rest_available() {
    let jokes = Arc::new(LabeledProtocol::new(
        "jokes",
        vec![ToolDescriptor::new("random_joke")],
    ));
    let catalog = build_catalog(&[
        ToolSource::new("broken", Arc::new(UnlistableProtocol), SanitizerKind::None),
        ToolSource::new("jokes", jokes, SanitizerKind::None),
    ])
    .await;

    assert_eq!(catalog.route_count(), 1);
    assert!(catalog.route("random_joke").is_some());
    assert_eq!(catalog.failures.len(), 1);
    assert_eq!(catalog.failures[0].label, "broken");
    assert!(catalog.failures[0].message.contains("refused to enumerate"));
}

#[tokio::test]
async fn probe_reports_tool_count_for_healthy_providers() {
    let jokes = LabeledProtocol::new(
        "jokes",
        vec![
            ToolDescriptor::new("random_joke"),
            ToolDescriptor::new("meal_of_the_day"),
        ],
    );
    let count = probe_connection(&jokes, std::time::Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn probe_surfaces_listing_failures() {
    let err = probe_connection(&UnlistableProtocol, std::time::Duration::from_secs(1))
        .await
        .err()
        .expect("probe should fail");
    assert!(err.to_string().contains("refused to enumerate"));
}
