//! Argument Sanitizer
//!
//! Before any model-issued tool call is dispatched, its arguments pass
//! through a sanitizer chosen per provider. The model is an untrusted input
//! source: it may supply absolute paths, `..` traversal segments, or omit
//! path arguments entirely. The sanitizers rewrite path-bearing arguments so
//! that every filesystem and repository path stays strictly inside its
//! configured base directory, and maintain the session's current repository
//! path so the model can omit it on follow-up calls.
//!
//! Confinement is path-string validation only — components are resolved
//! lexically, without touching the filesystem, so the algorithm works for
//! paths that do not exist yet. OS-level sandboxing is out of scope.

use crate::toolbridge::config::SandboxConfig;
use serde_json::Value as JsonValue;
use std::path::{Component, Path, PathBuf};

/// Which rewrite a provider's arguments receive before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizerKind {
    /// Confine `path` / `source` / `destination` arguments.
    Filesystem,
    /// Confine `repo_path` and track it across calls; rewrite staged files.
    VersionControl,
    /// Arguments carry no filesystem semantics; pass through untouched.
    None,
}

/// Per-conversation sanitizer state.
///
/// Initialized empty when a session starts; the version-control sanitizer
/// records every explicitly supplied repository path here, and both
/// path-aware sanitizers read it back when a later call omits the path.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub current_repo_path: Option<PathBuf>,
}

/// Argument key carrying the repository path on version-control tools.
const REPO_PATH_KEY: &str = "repo_path";
/// The staging tool whose file list needs repo-relative rewriting.
const STAGE_TOOL: &str = "git_add";
/// Argument key carrying the staged file list.
const STAGE_FILES_KEY: &str = "files";
/// Repository directory used when the model never names one.
const DEFAULT_REPO_DIR: &str = "repo-mcp";
/// Filesystem argument keys that carry paths by convention.
const PATH_KEYS: [&str; 3] = ["path", "source", "destination"];

/// Force `input` to a path equal to or strictly inside `base`.
///
/// `input` is resolved to an absolute, lexically normalized path (joined
/// onto `base` first when relative; `..` pops, `.` drops). If the resolved
/// path escapes `base`, it is discarded and only the final path segment of
/// the original input survives, joined onto `base` — an attacker's directory
/// structure is flattened rather than honored. When the input has no usable
/// final segment (e.g. `".."`), the base itself is returned.
///
/// Callers must not assume the sanitized value preserves the caller's
/// intended subdirectory layout once an escape attempt was detected.
pub fn force_under_base(base: &Path, input: &str) -> PathBuf {
    let candidate = Path::new(input);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };
    let resolved = normalize(&joined);

    if resolved == base || resolved.starts_with(base) {
        return resolved;
    }

    match safe_file_name(candidate) {
        Some(name) => base.join(name),
        None => base.to_path_buf(),
    }
}

/// Lexical normalization: `..` pops, `.` drops, no filesystem access.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Final path segment of `input`, excluding `..`.
fn safe_file_name(input: &Path) -> Option<&std::ffi::OsStr> {
    input.file_name()
}

/// Rewrite `raw_args` according to the provider's sanitizer kind.
///
/// Pure aside from reading and writing `state.current_repo_path`. Sanitizers
/// always produce a value — unsafe inputs are coerced, never rejected.
pub fn sanitize_arguments(
    tool_name: &str,
    raw_args: JsonValue,
    kind: SanitizerKind,
    sandbox: &SandboxConfig,
    state: &mut SessionState,
) -> JsonValue {
    match kind {
        SanitizerKind::None => raw_args,
        SanitizerKind::VersionControl => sanitize_version_control(tool_name, raw_args, sandbox, state),
        SanitizerKind::Filesystem => sanitize_filesystem(raw_args, sandbox, state),
    }
}

fn sanitize_version_control(
    tool_name: &str,
    mut args: JsonValue,
    sandbox: &SandboxConfig,
    state: &mut SessionState,
) -> JsonValue {
    // A repository path is always injected, so the arguments must be an
    // object even when the model sent none at all.
    if !args.is_object() {
        args = JsonValue::Object(serde_json::Map::new());
    }

    let supplied = args
        .get(REPO_PATH_KEY)
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    let repo = match supplied {
        Some(path) => {
            let confined = force_under_base(&sandbox.repository_base, &path);
            state.current_repo_path = Some(confined.clone());
            confined
        }
        None => match &state.current_repo_path {
            Some(current) => current.clone(),
            None => {
                let default = sandbox.repository_base.join(DEFAULT_REPO_DIR);
                state.current_repo_path = Some(default.clone());
                default
            }
        },
    };

    if let Some(map) = args.as_object_mut() {
        map.insert(
            REPO_PATH_KEY.to_string(),
            JsonValue::String(repo.to_string_lossy().into_owned()),
        );
        if tool_name == STAGE_TOOL {
            if let Some(files) = map.get_mut(STAGE_FILES_KEY).and_then(JsonValue::as_array_mut) {
                for entry in files.iter_mut() {
                    if let Some(file) = entry.as_str() {
                        if Path::new(file).is_absolute() {
                            *entry = JsonValue::String(relative_to_repo(&repo, file));
                        }
                    }
                }
            }
        }
    }

    args
}

/// Rewrite an absolute staged-file path relative to the repository.
///
/// Paths outside the repository keep only their final segment; an entry that
/// collapses to nothing becomes `"."`.
fn relative_to_repo(repo: &Path, file: &str) -> String {
    let rewritten = match Path::new(file).strip_prefix(repo) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => safe_file_name(Path::new(file))
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if rewritten.is_empty() {
        ".".to_string()
    } else {
        rewritten
    }
}

fn sanitize_filesystem(
    mut args: JsonValue,
    sandbox: &SandboxConfig,
    state: &mut SessionState,
) -> JsonValue {
    let repo = state.current_repo_path.clone();
    if let Some(map) = args.as_object_mut() {
        for key in PATH_KEYS.iter() {
            let value = match map.get(*key).and_then(JsonValue::as_str) {
                Some(value) => value.to_string(),
                None => continue,
            };
            let rewritten = match &repo {
                // The repository path was confined when it was set; resolve
                // against it, reducing absolute inputs to a bare filename.
                Some(repo) => {
                    let candidate = Path::new(&value);
                    if candidate.is_absolute() {
                        match safe_file_name(candidate) {
                            Some(name) => repo.join(name),
                            None => repo.clone(),
                        }
                    } else {
                        repo.join(candidate)
                    }
                }
                None => force_under_base(&sandbox.demo_base, &value),
            };
            map.insert(
                (*key).to_string(),
                JsonValue::String(rewritten.to_string_lossy().into_owned()),
            );
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sandbox() -> SandboxConfig {
        SandboxConfig::new("/sandbox/repos", "/sandbox/demo")
    }

    #[test]
    fn test_force_under_base_accepts_relative_paths() {
        let base = Path::new("/sandbox/repos");
        assert_eq!(
            force_under_base(base, "myrepo/src"),
            PathBuf::from("/sandbox/repos/myrepo/src")
        );
    }

    #[test]
    fn test_force_under_base_accepts_inside_absolute_paths() {
        let base = Path::new("/sandbox/repos");
        assert_eq!(
            force_under_base(base, "/sandbox/repos/myrepo"),
            PathBuf::from("/sandbox/repos/myrepo")
        );
    }

    #[test]
    fn test_force_under_base_coerces_escapes_to_basename() {
        let base = Path::new("/sandbox/repos");
        assert_eq!(
            force_under_base(base, "../../etc/passwd"),
            PathBuf::from("/sandbox/repos/passwd")
        );
        assert_eq!(
            force_under_base(base, "/etc/passwd"),
            PathBuf::from("/sandbox/repos/passwd")
        );
    }

    #[test]
    fn test_force_under_base_never_leaves_the_base() {
        let base = Path::new("/sandbox/repos");
        let hostile = [
            "..",
            "../..",
            "/",
            "/etc",
            "a/../../../b",
            "./../../x/../../y",
            "/sandbox/repos/../repos-evil/file",
        ];
        for input in hostile.iter() {
            let result = force_under_base(base, input);
            assert!(
                result == base || result.starts_with(base),
                "{:?} escaped to {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_force_under_base_resolves_inner_traversal() {
        let base = Path::new("/sandbox/repos");
        // Traversal that stays inside the base is honored, not flattened.
        assert_eq!(
            force_under_base(base, "a/b/../c"),
            PathBuf::from("/sandbox/repos/a/c")
        );
    }

    #[test]
    fn test_version_control_confines_and_records_repo_path() {
        let mut state = SessionState::default();
        let args = sanitize_arguments(
            "git_status",
            json!({"repo_path": "../../etc"}),
            SanitizerKind::VersionControl,
            &sandbox(),
            &mut state,
        );
        assert_eq!(args["repo_path"], "/sandbox/repos/etc");
        assert_eq!(state.current_repo_path, Some(PathBuf::from("/sandbox/repos/etc")));
    }

    #[test]
    fn test_version_control_reuses_session_repo_path() {
        let mut state = SessionState::default();
        let first = sanitize_arguments(
            "git_status",
            json!({"repo_path": "myrepo"}),
            SanitizerKind::VersionControl,
            &sandbox(),
            &mut state,
        );
        let second = sanitize_arguments(
            "git_log",
            json!({}),
            SanitizerKind::VersionControl,
            &sandbox(),
            &mut state,
        );
        assert_eq!(first["repo_path"], "/sandbox/repos/myrepo");
        assert_eq!(second["repo_path"], first["repo_path"]);
    }

    #[test]
    fn test_version_control_defaults_when_no_path_known() {
        let mut state = SessionState::default();
        let args = sanitize_arguments(
            "git_status",
            json!({}),
            SanitizerKind::VersionControl,
            &sandbox(),
            &mut state,
        );
        assert_eq!(args["repo_path"], "/sandbox/repos/repo-mcp");
        assert_eq!(
            state.current_repo_path,
            Some(PathBuf::from("/sandbox/repos/repo-mcp"))
        );
    }

    #[test]
    fn test_stage_files_rewrites_absolute_entries() {
        let mut state = SessionState::default();
        let args = sanitize_arguments(
            "git_add",
            json!({
                "repo_path": "myrepo",
                "files": [
                    "/sandbox/repos/myrepo/src/main.rs",
                    "/sandbox/repos/myrepo",
                    "/elsewhere/notes.txt",
                    "docs/readme.md"
                ]
            }),
            SanitizerKind::VersionControl,
            &sandbox(),
            &mut state,
        );
        let files = args["files"].as_array().unwrap();
        assert_eq!(files[0], "src/main.rs");
        // The repository root itself collapses to ".".
        assert_eq!(files[1], ".");
        // Absolute but outside the repo: only the basename survives.
        assert_eq!(files[2], "notes.txt");
        // Relative entries pass through unchanged.
        assert_eq!(files[3], "docs/readme.md");
    }

    #[test]
    fn test_filesystem_uses_demo_base_without_repo() {
        let mut state = SessionState::default();
        let args = sanitize_arguments(
            "read_file",
            json!({"path": "../secrets.txt"}),
            SanitizerKind::Filesystem,
            &sandbox(),
            &mut state,
        );
        assert_eq!(args["path"], "/sandbox/demo/secrets.txt");
    }

    #[test]
    fn test_filesystem_resolves_against_current_repo() {
        let mut state = SessionState {
            current_repo_path: Some(PathBuf::from("/sandbox/repos/myrepo")),
        };
        let args = sanitize_arguments(
            "move_file",
            json!({
                "source": "/tmp/stolen/original.txt",
                "destination": "notes/copy.txt",
                "other": "untouched"
            }),
            SanitizerKind::Filesystem,
            &sandbox(),
            &mut state,
        );
        // Absolute inputs lose their directory component.
        assert_eq!(args["source"], "/sandbox/repos/myrepo/original.txt");
        // Relative inputs resolve under the repository.
        assert_eq!(args["destination"], "/sandbox/repos/myrepo/notes/copy.txt");
        // Keys without filesystem meaning are left alone.
        assert_eq!(args["other"], "untouched");
    }

    #[test]
    fn test_none_kind_is_identity() {
        let mut state = SessionState::default();
        let args = json!({"path": "/etc/passwd", "q": "anything"});
        let sanitized = sanitize_arguments(
            "random_joke",
            args.clone(),
            SanitizerKind::None,
            &sandbox(),
            &mut state,
        );
        assert_eq!(sanitized, args);
        assert!(state.current_repo_path.is_none());
    }
}
