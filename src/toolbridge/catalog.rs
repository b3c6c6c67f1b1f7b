//! Catalog Builder
//!
//! Unifies the tool lists of every configured provider into one flat,
//! ordered, model-facing catalog and a routing table mapping each tool name
//! to the connection (and sanitizer) that serves it. The catalog is rebuilt
//! wholesale whenever tools are (re-)enabled; it is never mutated
//! incrementally.

use crate::toolbridge::sanitizer::SanitizerKind;
use crate::toolbridge::tool_protocol::ToolProtocol;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// One configured provider: a display label, a live connection, and the
/// argument sanitizer its tools are dispatched through.
pub struct ToolSource {
    pub label: String,
    pub connection: Arc<dyn ToolProtocol>,
    pub sanitizer: SanitizerKind,
}

impl ToolSource {
    pub fn new(
        label: impl Into<String>,
        connection: Arc<dyn ToolProtocol>,
        sanitizer: SanitizerKind,
    ) -> Self {
        Self {
            label: label.into(),
            connection,
            sanitizer,
        }
    }
}

/// A tool as presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

/// Where calls for one tool name are dispatched.
#[derive(Clone)]
pub struct RouteEntry {
    pub connection: Arc<dyn ToolProtocol>,
    pub sanitizer: SanitizerKind,
}

/// A provider that could not contribute to the catalog.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub label: String,
    pub message: String,
}

/// The unified catalog plus its routing table.
#[derive(Default)]
pub struct ToolCatalog {
    /// Flat, ordered, model-facing tool definitions.
    pub tools: Vec<ToolDefinition>,
    /// Providers whose tool listing failed during the build.
    pub failures: Vec<ProviderFailure>,
    routes: HashMap<String, RouteEntry>,
}

impl ToolCatalog {
    /// Look up the route for a tool name.
    pub fn route(&self, tool_name: &str) -> Option<&RouteEntry> {
        self.routes.get(tool_name)
    }

    /// Number of routable tool names.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Query every source concurrently and assemble the unified catalog.
///
/// A provider that fails to list its tools does not abort the build: the
/// failure is logged, recorded in [`ToolCatalog::failures`] for the caller
/// to report, and the remaining providers are still cataloged. When two
/// providers declare the same tool name, the later source in input order
/// wins the route (a warning is logged; the flat catalog keeps both
/// definitions in declaration order).
pub async fn build_catalog(sources: &[ToolSource]) -> ToolCatalog {
    let listings = join_all(sources.iter().map(|source| source.connection.list_tools())).await;

    let mut catalog = ToolCatalog::default();
    for (source, listing) in sources.iter().zip(listings) {
        let descriptors = match listing {
            Ok(descriptors) => descriptors,
            Err(e) => {
                log::warn!("provider '{}' failed to list tools: {}", source.label, e);
                catalog.failures.push(ProviderFailure {
                    label: source.label.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        for descriptor in descriptors {
            if catalog.routes.contains_key(&descriptor.name) {
                log::warn!(
                    "tool '{}' redeclared by provider '{}'; later registration wins",
                    descriptor.name,
                    source.label
                );
            }
            catalog.tools.push(ToolDefinition {
                name: descriptor.name.clone(),
                description: descriptor
                    .description
                    .unwrap_or_else(|| format!("{} tool", source.label)),
                input_schema: descriptor.input_schema.unwrap_or_else(open_object_schema),
            });
            catalog.routes.insert(
                descriptor.name,
                RouteEntry {
                    connection: Arc::clone(&source.connection),
                    sanitizer: source.sanitizer,
                },
            );
        }
    }

    log::debug!(
        "catalog built: {} tools from {} providers ({} failed)",
        catalog.tools.len(),
        sources.len(),
        catalog.failures.len()
    );
    catalog
}

/// Open schema used when a provider declares none.
fn open_object_schema() -> JsonValue {
    json!({"type": "object"})
}
