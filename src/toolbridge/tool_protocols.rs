//! Tool Protocol Implementations
//!
//! This module provides the concrete transports behind the [`ToolProtocol`]
//! trait. Each struct is a complete provider connection; they can be used
//! individually or combined into one catalog via the catalog builder.
//!
//! # Available Implementations
//!
//! - **ProcessToolProtocol**: spawns a provider as a local subprocess and
//!   speaks newline-delimited JSON-RPC over its standard streams. The
//!   subprocess lifetime is owned by the connection; there is no
//!   restart-on-crash logic, so a dead child fails every subsequent call.
//! - **RemoteToolProtocol**: posts one JSON-RPC 2.0 request per call to an
//!   HTTP endpoint. Its tool catalog is declared by hand at construction
//!   time rather than fetched from the service, and tool names are mapped to
//!   RPC methods through a local alias table.
//!
//! Each transport commits to one response adapter at construction time:
//! process results are parsed as typed content segments, remote results are
//! treated as plain JSON values. Callers never re-discover the shape per call.

use crate::toolbridge::config::{ProcessProviderConfig, RemoteProviderConfig};
use crate::toolbridge::tool_protocol::{
    ContentSegment, ToolDescriptor, ToolError, ToolOutcome, ToolProtocol,
};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::error::Error;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Wire version sent during the provider handshake.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// A provider connection backed by a local subprocess.
///
/// The child process is spawned with piped standard streams and killed when
/// the connection is dropped. All requests are serialized through an internal
/// session lock, so responses can be matched to requests by id while server
/// notifications interleaved on stdout are skipped.
pub struct ProcessToolProtocol {
    provider: String,
    session: Mutex<StdioSession>,
}

struct StdioSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl ProcessToolProtocol {
    /// Spawn the provider subprocess and perform the initialize handshake.
    ///
    /// Fails with [`ToolError::Connection`] naming the provider when the
    /// process cannot be spawned, its streams cannot be captured, or the
    /// handshake is rejected.
    pub async fn connect(
        label: impl Into<String>,
        config: &ProcessProviderConfig,
    ) -> Result<Self, ToolError> {
        let label = label.into();

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &config.env {
            command.env(key, value);
        }
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            ToolError::Connection(format!("failed to spawn provider '{}': {}", label, e))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ToolError::Connection(format!("provider '{}' exposed no stdin", label))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ToolError::Connection(format!("provider '{}' exposed no stdout", label))
        })?;

        let mut session = StdioSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        };

        log::debug!("handshaking with provider '{}'", label);
        session
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await
            .map_err(|e| {
                ToolError::Connection(format!("handshake with provider '{}' failed: {}", label, e))
            })?;
        session
            .notify("notifications/initialized", json!({}))
            .await
            .map_err(|e| {
                ToolError::Connection(format!("handshake with provider '{}' failed: {}", label, e))
            })?;

        Ok(Self {
            provider: label,
            session: Mutex::new(session),
        })
    }

    /// Name of the provider this connection was created for.
    pub fn provider(&self) -> &str {
        &self.provider
    }
}

impl StdioSession {
    /// Issue one request and wait for the response carrying the same id.
    ///
    /// Lines that are not the awaited response (server notifications, log
    /// output that happens to be JSON, unparseable noise) are skipped. A
    /// closed stdout means the child died; the error is surfaced as-is and
    /// every later call will fail the same way.
    async fn request(
        &mut self,
        method: &str,
        params: JsonValue,
    ) -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
        self.next_id += 1;
        let id = self.next_id;
        self.write_line(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(Box::new(ToolError::Connection(
                    "provider closed its output stream".to_string(),
                )));
            }
            let message: JsonValue = match serde_json::from_str(line.trim()) {
                Ok(value) => value,
                Err(_) => continue,
            };
            if message.get("id").and_then(JsonValue::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                let text = error
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("unknown provider error");
                return Err(Box::new(ToolError::CallFailed(text.to_string())));
            }
            return Ok(message.get("result").cloned().unwrap_or(JsonValue::Null));
        }
    }

    /// Send a notification (no id, no response expected).
    async fn notify(
        &mut self,
        method: &str,
        params: JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.write_line(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    async fn write_line(&mut self, message: &JsonValue) -> Result<(), Box<dyn Error + Send + Sync>> {
        let payload = serde_json::to_string(message)?;
        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ToolProtocol for ProcessToolProtocol {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, Box<dyn Error + Send + Sync>> {
        let mut session = self.session.lock().await;
        let result = session.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        let descriptors: Vec<ToolDescriptor> = serde_json::from_value(tools)?;
        Ok(descriptors)
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<ToolOutcome, Box<dyn Error + Send + Sync>> {
        log::debug!("dispatching '{}' to provider '{}'", tool_name, self.provider);
        let mut session = self.session.lock().await;
        let result = session
            .request(
                "tools/call",
                json!({"name": tool_name, "arguments": arguments}),
            )
            .await?;

        let segments = result
            .get("content")
            .and_then(JsonValue::as_array)
            .map(|content| parse_segments(content));

        if result
            .get("isError")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
        {
            let text = ToolOutcome::Content(segments.unwrap_or_default()).render_text();
            return Err(Box::new(ToolError::CallFailed(text)));
        }

        match segments {
            Some(segments) => Ok(ToolOutcome::Content(segments)),
            None => Ok(ToolOutcome::Value(result)),
        }
    }

    fn protocol_name(&self) -> &str {
        "process"
    }

    async fn shutdown(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut session = self.session.lock().await;
        session.child.kill().await?;
        Ok(())
    }
}

fn parse_segments(content: &[JsonValue]) -> Vec<ContentSegment> {
    content
        .iter()
        .map(|segment| {
            let is_text = segment.get("type").and_then(JsonValue::as_str) == Some("text");
            match segment.get("text").and_then(JsonValue::as_str) {
                Some(text) if is_text => ContentSegment::Text(text.to_string()),
                _ => ContentSegment::Other(segment.clone()),
            }
        })
        .collect()
}

/// A provider connection backed by a remote HTTP JSON-RPC endpoint.
///
/// The connection holds no per-call state and is safe to share and reuse.
/// Its tool list is declared by hand through [`with_tool`](Self::with_tool)
/// rather than discovered from the service; each declared tool carries the
/// RPC method its calls are routed to.
///
/// # Example
///
/// ```rust,no_run
/// use toolbridge::config::RemoteProviderConfig;
/// use toolbridge::tool_protocol::ToolDescriptor;
/// use toolbridge::tool_protocols::RemoteToolProtocol;
///
/// let config = RemoteProviderConfig::new("http://localhost:3000/rpc")
///     .with_header("X-Api-Key", "secret");
///
/// let provider = RemoteToolProtocol::new(&config)
///     .with_tool(
///         ToolDescriptor::new("random_joke").with_description("Fetch a random joke"),
///         "joke.random",
///     );
/// ```
pub struct RemoteToolProtocol {
    endpoint: String,
    headers: HashMap<String, String>,
    client: reqwest::Client,
    tools: Vec<ToolDescriptor>,
    methods: HashMap<String, String>,
}

impl RemoteToolProtocol {
    /// Create a connection to the given endpoint with an empty catalog.
    pub fn new(config: &RemoteProviderConfig) -> Self {
        Self {
            endpoint: config.url.clone(),
            headers: config.headers.clone(),
            client: reqwest::Client::new(),
            tools: Vec::new(),
            methods: HashMap::new(),
        }
    }

    /// Override the default (unbounded) HTTP timeout.
    ///
    /// Dispatched tool calls carry no deadline by default — a hung provider
    /// hangs the fulfillment loop. Embedders that prefer bounded calls can
    /// opt in here.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        self
    }

    /// Declare a tool and the RPC method its calls translate to.
    ///
    /// The declared descriptors form the entire catalog this provider
    /// reports; nothing is fetched from the remote service.
    pub fn with_tool(mut self, descriptor: ToolDescriptor, rpc_method: impl Into<String>) -> Self {
        self.methods
            .insert(descriptor.name.clone(), rpc_method.into());
        self.tools.push(descriptor);
        self
    }

    /// RPC method a tool name resolves to (the name itself when unaliased).
    pub fn rpc_method(&self, tool_name: &str) -> String {
        self.methods
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| tool_name.to_string())
    }

    /// Time-based request id. Uniqueness is not guaranteed; responses are
    /// consumed immediately per request, so collisions are harmless.
    fn next_request_id() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl ToolProtocol for RemoteToolProtocol {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, Box<dyn Error + Send + Sync>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: JsonValue,
    ) -> Result<ToolOutcome, Box<dyn Error + Send + Sync>> {
        let method = self.rpc_method(tool_name);
        log::debug!("posting '{}' as '{}' to {}", tool_name, method, self.endpoint);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": Self::next_request_id(),
            "method": method,
            "params": arguments,
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            Box::new(ToolError::CallFailed(e.to_string())) as Box<dyn Error + Send + Sync>
        })?;

        if !response.status().is_success() {
            return Err(Box::new(ToolError::CallFailed(format!(
                "remote provider returned status: {}",
                response.status()
            ))));
        }

        let body: JsonValue = response.json().await.map_err(|e| {
            Box::new(ToolError::CallFailed(format!(
                "remote provider returned invalid JSON: {}",
                e
            ))) as Box<dyn Error + Send + Sync>
        })?;

        if let Some(error) = body.get("error") {
            let text = error
                .get("message")
                .and_then(JsonValue::as_str)
                .unwrap_or("unknown remote error");
            return Err(Box::new(ToolError::CallFailed(text.to_string())));
        }

        Ok(ToolOutcome::Value(
            body.get("result").cloned().unwrap_or(JsonValue::Null),
        ))
    }

    fn protocol_name(&self) -> &str {
        "remote"
    }
}
