//! The `tool_session` module drives one conversation's tool-fulfillment
//! loop: query the model, execute every tool invocation it issued, feed the
//! results back, and repeat until the model answers without tool calls.
//!
//! The session is the explicit context object for a conversation — it owns
//! the conversation history, the unified catalog, the sandbox configuration,
//! and the sanitizer state. Multiple concurrent conversations coexist by
//! owning separate sessions; there is no module-level state.
//!
//! ## Quickstart
//!
//! ```ignore
//! let catalog = build_catalog(&sources).await;
//! let mut session = ToolSession::new(client, catalog, sandbox.resolved()?);
//!
//! let reply = session.send("What changed in my repo?").await?;
//! println!("{}", reply.text());
//! ```
//!
//! The loop is bounded: a model that keeps issuing tool calls indefinitely
//! is cut off after a configurable number of rounds with a terminal error.

use crate::toolbridge::catalog::ToolCatalog;
use crate::toolbridge::client_wrapper::{ChatClient, ContentBlock, Message, Role};
use crate::toolbridge::config::SandboxConfig;
use crate::toolbridge::sanitizer::{sanitize_arguments, SessionState};
use crate::toolbridge::tool_protocol::ToolError;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;

/// Model exchanges allowed per [`ToolSession::send`] before the loop is cut off.
const DEFAULT_MAX_ROUNDS: usize = 16;

/// A conversation session with tool fulfillment, including:
///
/// - `client`: the embedding application's [`ChatClient`].
/// - `catalog`: the unified tool catalog and routing table.
/// - `sandbox`: base directories the sanitizers confine paths to.
/// - `state`: the sanitizers' cross-call state (current repository path).
/// - `conversation_history`: all user and assistant messages so far.
pub struct ToolSession {
    client: Arc<dyn ChatClient>,
    catalog: ToolCatalog,
    sandbox: SandboxConfig,
    state: SessionState,
    conversation_history: Vec<Message>,
    max_rounds: usize,
}

impl ToolSession {
    /// Create a session over the given client, catalog, and sandbox.
    pub fn new(client: Arc<dyn ChatClient>, catalog: ToolCatalog, sandbox: SandboxConfig) -> Self {
        Self {
            client,
            catalog,
            sandbox,
            state: SessionState::default(),
            conversation_history: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Override the tool-loop round limit (builder pattern).
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Replace the catalog, e.g. after tools were re-enabled.
    pub fn set_catalog(&mut self, catalog: ToolCatalog) {
        self.catalog = catalog;
    }

    /// Borrow the conversation history accumulated so far.
    pub fn get_conversation_history(&self) -> &[Message] {
        &self.conversation_history
    }

    /// Borrow the sanitizer state (e.g. to inspect the current repository path).
    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    /// Forget the conversation and the sanitizer state, keeping the catalog.
    pub fn reset(&mut self) {
        self.conversation_history.clear();
        self.state = SessionState::default();
    }

    /// Send a user message and run the fulfillment loop to completion.
    ///
    /// Each round queries the model with the full conversation plus the
    /// catalog; the response joins the history unconditionally. Its
    /// `tool_use` blocks are then executed in order — an unknown name
    /// produces an error result without touching any connection, a known
    /// name is sanitized and dispatched, and any dispatch failure is caught
    /// and converted into an error result rather than propagated. All
    /// results of a round are fed back as one user turn.
    ///
    /// Returns the first model response that contains no tool invocations,
    /// or [`ToolError::LoopLimitExceeded`] when the round limit is reached.
    pub async fn send(
        &mut self,
        user_message: impl Into<String>,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.conversation_history.push(Message::user(user_message));
        self.fulfill().await
    }

    async fn fulfill(&mut self) -> Result<Message, Box<dyn Error + Send + Sync>> {
        for _ in 0..self.max_rounds {
            let reply = self
                .client
                .send_message(&self.conversation_history, &self.catalog.tools)
                .await?;
            self.conversation_history.push(reply.clone());

            let invocations: Vec<(String, String, JsonValue)> = reply
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            if invocations.is_empty() {
                return Ok(reply);
            }

            let mut results = Vec::with_capacity(invocations.len());
            for (id, name, input) in invocations {
                results.push(self.execute_invocation(&id, &name, input).await);
            }
            self.conversation_history.push(Message {
                role: Role::User,
                content: results,
            });
        }

        Err(Box::new(ToolError::LoopLimitExceeded(self.max_rounds)))
    }

    /// Execute one invocation block, always producing a result block.
    async fn execute_invocation(&mut self, id: &str, name: &str, input: JsonValue) -> ContentBlock {
        let route = match self.catalog.route(name) {
            Some(route) => route.clone(),
            None => {
                log::warn!("model requested unknown tool '{}'", name);
                return ContentBlock::tool_result(
                    id,
                    ToolError::NotRegistered(name.to_string()).to_string(),
                    true,
                );
            }
        };

        let arguments =
            sanitize_arguments(name, input, route.sanitizer, &self.sandbox, &mut self.state);

        match route.connection.call_tool(name, arguments).await {
            Ok(outcome) => ContentBlock::tool_result(id, outcome.render_text(), false),
            Err(e) => {
                log::warn!("tool '{}' failed: {}", name, e);
                ContentBlock::tool_result(id, e.to_string(), true)
            }
        }
    }
}
