//! Tool Protocol Abstraction Layer
//!
//! This module defines the capability interface shared by every tool provider
//! the bridge can talk to, regardless of transport. A provider is anything
//! that can enumerate a tool catalog and execute a named tool: a subprocess
//! speaking JSON-RPC over its standard streams, or a remote HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ToolSession → ToolCatalog → ToolProtocol (trait) → [Process | Remote | User-defined]
//! ```
//!
//! Callers never inspect which variant they hold; both transports implement
//! [`ToolProtocol`] and are routed through the same catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// A tool as declared by a provider.
///
/// Descriptors are immutable once fetched and live only for the lifetime of
/// the catalog that holds them. `description` and `input_schema` are optional
/// on the wire; the catalog builder substitutes fallbacks for the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "inputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<JsonValue>,
}

impl ToolDescriptor {
    /// Declare a tool with the given name and no description or schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Attach a human readable description surfaced to the model.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a JSON-schema-like object describing the tool's arguments.
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// One typed segment of a structured provider result.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSegment {
    /// Plain text content.
    Text(String),
    /// Any non-text segment, kept verbatim.
    Other(JsonValue),
}

/// The result of one tool call.
///
/// Providers answer either with a structured sequence of typed content
/// segments, or with an arbitrary JSON-serializable value. Which form a
/// provider uses is fixed per transport variant at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Structured content as returned by segment-based providers.
    Content(Vec<ContentSegment>),
    /// A plain JSON value returned by value-based providers.
    Value(JsonValue),
}

impl ToolOutcome {
    /// Flatten the outcome into the text fed back to the model.
    ///
    /// Text segments are joined with newlines; non-text segments and plain
    /// values are serialized as JSON.
    pub fn render_text(&self) -> String {
        match self {
            ToolOutcome::Content(segments) => segments
                .iter()
                .map(|segment| match segment {
                    ContentSegment::Text(text) => text.clone(),
                    ContentSegment::Other(value) => value.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ToolOutcome::Value(value) => value.to_string(),
        }
    }
}

/// Trait implemented by every tool provider transport.
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    /// Enumerate the tools this provider offers.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, Box<dyn Error + Send + Sync>>;

    /// Execute a named tool with already-sanitized arguments.
    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<ToolOutcome, Box<dyn Error + Send + Sync>>;

    /// Transport identifier (e.g. "process", "remote").
    fn protocol_name(&self) -> &str;

    /// Release any resources held by the provider connection.
    async fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Error types for bridge operations
#[derive(Debug, Clone)]
pub enum ToolError {
    /// Provider unreachable or misconfigured. Fatal to that provider's
    /// availability, not to the whole process.
    Connection(String),
    /// Provider was reached but failed to report its tool catalog.
    CatalogUnavailable(String),
    /// Requested tool name is absent from the routing table.
    NotRegistered(String),
    /// Provider rejected or failed an individual call.
    CallFailed(String),
    /// The fulfillment loop hit its configured round limit.
    LoopLimitExceeded(usize),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            ToolError::CatalogUnavailable(msg) => write!(f, "Tool listing failed: {}", msg),
            ToolError::NotRegistered(name) => write!(f, "Tool not registered: {}", name),
            ToolError::CallFailed(msg) => write!(f, "Tool call failed: {}", msg),
            ToolError::LoopLimitExceeded(rounds) => {
                write!(f, "Tool loop limit exceeded after {} rounds", rounds)
            }
        }
    }
}

impl Error for ToolError {}

/// Race a provider's tool listing against a fixed deadline.
///
/// Returns the number of tools the provider reported, or an error when the
/// provider failed or did not answer in time. Useful for operator-facing
/// connectivity checks; the fulfillment loop itself never imposes deadlines.
pub async fn probe_connection(
    connection: &dyn ToolProtocol,
    deadline: Duration,
) -> Result<usize, ToolError> {
    match tokio::time::timeout(deadline, connection.list_tools()).await {
        Ok(Ok(tools)) => Ok(tools.len()),
        Ok(Err(e)) => Err(ToolError::CatalogUnavailable(format!(
            "{} provider: {}",
            connection.protocol_name(),
            e
        ))),
        Err(_) => Err(ToolError::Connection(format!(
            "{} provider did not answer within {:?}",
            connection.protocol_name(),
            deadline
        ))),
    }
}
