//! Configuration for the tool bridge.
//!
//! Provides the per-provider transport parameters and the sandbox base
//! directories used by the argument sanitizer. Users construct these
//! structs manually — no file parsing dependencies are introduced; loading
//! values from the environment is the embedding application's concern.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Parameters for a provider launched as a local subprocess.
#[derive(Debug, Clone)]
pub struct ProcessProviderConfig {
    /// Executable to spawn (e.g. `"uvx"`, `"npx"`).
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment variables for the subprocess.
    pub env: HashMap<String, String>,
    /// Working directory for the subprocess, when it matters to the provider.
    pub cwd: Option<PathBuf>,
}

impl ProcessProviderConfig {
    /// Describe a subprocess provider started from the given executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append one command-line argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several command-line arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the subprocess.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the subprocess working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Parameters for a provider reached over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct RemoteProviderConfig {
    /// Endpoint URL the JSON-RPC requests are posted to.
    pub url: String,
    /// Extra HTTP headers sent with every request (e.g. API keys).
    pub headers: HashMap<String, String>,
}

impl RemoteProviderConfig {
    /// Describe a remote provider at the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Attach an HTTP header to every request sent to the provider.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// The two base directories path arguments are confined to.
///
/// `repository_base` bounds every repository path the version-control
/// sanitizer accepts; `demo_base` bounds filesystem paths used before any
/// repository has been selected. Both are resolved against the process
/// working directory once, at startup, via [`SandboxConfig::resolved`].
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub repository_base: PathBuf,
    pub demo_base: PathBuf,
}

impl SandboxConfig {
    /// Build a sandbox rooted at the two given directories.
    pub fn new(repository_base: impl Into<PathBuf>, demo_base: impl Into<PathBuf>) -> Self {
        Self {
            repository_base: repository_base.into(),
            demo_base: demo_base.into(),
        }
    }

    /// Anchor relative base directories to the current working directory.
    pub fn resolved(self) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self {
            repository_base: absolutize(&cwd, self.repository_base),
            demo_base: absolutize(&cwd, self.demo_base),
        })
    }
}

impl Default for SandboxConfig {
    /// Sandbox rooted at `"repos"` and `"demo"` in the current directory.
    fn default() -> Self {
        Self {
            repository_base: PathBuf::from("repos"),
            demo_base: PathBuf::from("demo"),
        }
    }
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
