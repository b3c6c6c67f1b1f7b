//! # ToolBridge
//!
//! ToolBridge is a batteries-included Rust toolkit for connecting a
//! conversational LLM to independently-running tool providers — filesystem
//! and version-control servers launched as subprocesses, or arbitrary remote
//! JSON-RPC services — and driving the conversation's tool-fulfillment loop.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Transport Connectors**: one [`tool_protocol::ToolProtocol`] trait with
//!   process-backed and HTTP-backed implementations in [`tool_protocols`];
//!   callers never inspect which variant they hold
//! * **Catalog Unification**: [`catalog::build_catalog`] queries every
//!   provider concurrently and presents heterogeneous tool lists to the
//!   model in one uniform schema, with a name → connection routing table
//! * **Argument Sanitization**: [`sanitizer`] rewrites model-supplied path
//!   arguments so filesystem and repository paths can never escape their
//!   configured sandbox bases, even against `..` traversal or absolute paths
//! * **Tool Fulfillment**: [`ToolSession`] owns one conversation's history
//!   and sanitizer state and loops model ↔ tools until the model answers
//!   without tool calls (bounded by a configurable round limit)
//!
//! ## Core Concepts
//!
//! ### Building a catalog
//!
//! Each provider is registered as a [`catalog::ToolSource`] carrying a
//! label, a live connection, and the sanitizer its arguments pass through:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolbridge::catalog::{build_catalog, ToolSource};
//! use toolbridge::config::RemoteProviderConfig;
//! use toolbridge::sanitizer::SanitizerKind;
//! use toolbridge::tool_protocol::ToolDescriptor;
//! use toolbridge::tool_protocols::RemoteToolProtocol;
//!
//! # async fn demo() {
//! let jokes = RemoteToolProtocol::new(&RemoteProviderConfig::new("http://localhost:3000/rpc"))
//!     .with_tool(
//!         ToolDescriptor::new("random_joke").with_description("Fetch a random joke"),
//!         "joke.random",
//!     );
//!
//! let sources = vec![ToolSource::new("jokes", Arc::new(jokes), SanitizerKind::None)];
//! let catalog = build_catalog(&sources).await;
//! assert!(!catalog.is_empty());
//! # }
//! ```
//!
//! ### Driving a conversation
//!
//! The embedding application implements [`ChatClient`] over its LLM
//! provider; [`ToolSession::send`] does the rest:
//!
//! ```ignore
//! let sandbox = SandboxConfig::new("repos", "demo").resolved()?;
//! let mut session = ToolSession::new(client, catalog, sandbox);
//! let reply = session.send("Stage everything and show the status.").await?;
//! println!("{}", reply.text());
//! ```
//!
//! ### Path confinement
//!
//! The sanitizers treat the model as an untrusted input source. Every
//! repository and filesystem path argument is coerced into its sandbox base;
//! escape attempts survive only as a bare filename inside the base. See
//! [`sanitizer::force_under_base`] for the exact guarantee.
//!
//! Continue exploring the modules re-exported from the crate root for
//! progressively richer interaction patterns.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding
/// ToolBridge can opt-in to simple `RUST_LOG` driven diagnostics without
/// having to choose a specific logging backend upfront.
///
/// ```rust
/// toolbridge::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `toolbridge` module.
pub mod toolbridge;

// Re-exporting key items for easier external access.
pub use crate::toolbridge::catalog;
pub use crate::toolbridge::catalog::{
    build_catalog, ProviderFailure, RouteEntry, ToolCatalog, ToolDefinition, ToolSource,
};
pub use crate::toolbridge::client_wrapper;
pub use crate::toolbridge::client_wrapper::{ChatClient, ContentBlock, Message, Role};
pub use crate::toolbridge::config;
pub use crate::toolbridge::config::{ProcessProviderConfig, RemoteProviderConfig, SandboxConfig};
pub use crate::toolbridge::sanitizer;
pub use crate::toolbridge::sanitizer::{
    force_under_base, sanitize_arguments, SanitizerKind, SessionState,
};
pub use crate::toolbridge::tool_protocol;
pub use crate::toolbridge::tool_protocol::{
    probe_connection, ContentSegment, ToolDescriptor, ToolError, ToolOutcome, ToolProtocol,
};
pub use crate::toolbridge::tool_protocols;
pub use crate::toolbridge::tool_protocols::{ProcessToolProtocol, RemoteToolProtocol};
pub use crate::toolbridge::tool_session::ToolSession;
