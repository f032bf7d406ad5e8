//! File Tools
//!
//! Read access to a single sandboxed directory. Paths are resolved
//! relative to the configured root and may not escape it. Each
//! invocation bills one file operation against the caller's quota.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;

use concierge_core::{
    Capability, CapabilitySchema, FailureKind, Observation, ParameterSchema, ResourceKind, Result,
    ToolCall,
};

const MAX_READ_BYTES: u64 = 64 * 1024;

/// Reads text files from the sandbox directory
pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `CONCIERGE_FILES_DIR`, defaulting to `./workspace`
    pub fn from_env() -> anyhow::Result<Self> {
        let root =
            std::env::var("CONCIERGE_FILES_DIR").unwrap_or_else(|_| "./workspace".into());
        Ok(Self::new(root))
    }

    /// Resolve a user-supplied relative path inside the sandbox.
    /// Rejects absolute paths and any traversal components.
    fn resolve(&self, relative: &str) -> std::result::Result<PathBuf, String> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return Err("absolute paths are not allowed".into());
        }
        if candidate
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err("path may not contain '..'".into());
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl Capability for FileReadTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "read_file".into(),
            description: "Read a text file from the shared workspace directory".into(),
            parameters: vec![ParameterSchema::required(
                "path",
                "string",
                "Path of the file, relative to the workspace root",
            )],
            category: Some("files".into()),
            has_side_effects: false,
            resource_kind: Some(ResourceKind::FileOperation),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation> {
        let relative = call
            .arguments
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let path = match self.resolve(relative) {
            Ok(path) => path,
            Err(reason) => {
                return Ok(Observation::err(
                    "read_file",
                    FailureKind::InvalidArguments,
                    reason,
                ));
            }
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "File not readable");
                return Ok(Observation::err(
                    "read_file",
                    FailureKind::ExecutionError,
                    format!("'{}' could not be read", relative),
                ));
            }
        };

        if metadata.len() > MAX_READ_BYTES {
            return Ok(Observation::err(
                "read_file",
                FailureKind::ExecutionError,
                format!("'{}' is too large to read ({} bytes)", relative, metadata.len()),
            ));
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Observation::ok_with_data(
                "read_file",
                content,
                json!({"path": relative, "bytes": metadata.len()}),
            )),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "File read failed");
                Ok(Observation::err(
                    "read_file",
                    FailureKind::ExecutionError,
                    format!("'{}' could not be read as text", relative),
                ))
            }
        }
    }
}

/// Lists the sandbox directory
pub struct FileListTool {
    root: PathBuf,
}

impl FileListTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let root =
            std::env::var("CONCIERGE_FILES_DIR").unwrap_or_else(|_| "./workspace".into());
        Ok(Self::new(root))
    }
}

#[async_trait]
impl Capability for FileListTool {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema {
            name: "list_files".into(),
            description: "List the files available in the shared workspace directory".into(),
            parameters: vec![],
            category: Some("files".into()),
            has_side_effects: false,
            resource_kind: Some(ResourceKind::FileOperation),
        }
    }

    async fn execute(&self, _call: &ToolCall) -> Result<Observation> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(root = %self.root.display(), error = %e, "Workspace not listable");
                return Ok(Observation::err(
                    "list_files",
                    FailureKind::ExecutionError,
                    "the workspace directory could not be listed",
                ));
            }
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        if names.is_empty() {
            return Ok(Observation::ok("list_files", "The workspace is empty."));
        }
        Ok(Observation::ok("list_files", names.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sandbox() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("notes.txt")).unwrap();
        writeln!(file, "remember the milk").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_read_inside_sandbox() {
        let dir = sandbox();
        let tool = FileReadTool::new(dir.path());
        let call = ToolCall::new("read_file").with_arg("path", json!("notes.txt"));

        let obs = tool.execute(&call).await.unwrap();
        match obs {
            Observation::Ok { output, .. } => assert!(output.contains("remember the milk")),
            Observation::Err { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = sandbox();
        let tool = FileReadTool::new(dir.path());
        let call = ToolCall::new("read_file").with_arg("path", json!("../etc/passwd"));

        let obs = tool.execute(&call).await.unwrap();
        match obs {
            Observation::Err { kind, .. } => assert_eq!(kind, FailureKind::InvalidArguments),
            Observation::Ok { .. } => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_absolute_path_is_rejected() {
        let dir = sandbox();
        let tool = FileReadTool::new(dir.path());
        let call = ToolCall::new("read_file").with_arg("path", json!("/etc/passwd"));

        let obs = tool.execute(&call).await.unwrap();
        assert!(!obs.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_failure_observation() {
        let dir = sandbox();
        let tool = FileReadTool::new(dir.path());
        let call = ToolCall::new("read_file").with_arg("path", json!("nope.txt"));

        let obs = tool.execute(&call).await.unwrap();
        assert!(!obs.is_ok());
    }

    #[tokio::test]
    async fn test_list_files_sorted() {
        let dir = sandbox();
        std::fs::File::create(dir.path().join("alpha.txt")).unwrap();
        let tool = FileListTool::new(dir.path());

        let obs = tool.execute(&ToolCall::new("list_files")).await.unwrap();
        match obs {
            Observation::Ok { output, .. } => {
                assert_eq!(output, "alpha.txt\nnotes.txt");
            }
            Observation::Err { .. } => panic!("expected success"),
        }
    }
}
