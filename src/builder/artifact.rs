//! Artifact handles and per-node outcomes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity_id::EntityId;
use crate::core::platform::Platform;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A built artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub node: EntityId,
    pub fingerprint: String,
    /// Artifact root: a directory or a single file.
    pub path: PathBuf,
    /// Files of the artifact, relative to `path` when it is a directory.
    pub files: Vec<PathBuf>,
    /// Built during this run rather than reused.
    #[serde(skip)]
    pub fresh: bool,
    pub platform: Option<Platform>,
}

impl ArtifactHandle {
    /// Whether the artifact is still on disk.
    pub fn exists(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        if self.path.is_file() {
            return true;
        }
        self.files.iter().all(|f| self.path.join(f).exists())
    }

    pub fn root(&self) -> &Path {
        &self.path
    }
}

/// A node whose build step or layout failed.
#[derive(Debug, Clone, Error)]
#[error("failed to build `{node}`{}: {cause}", platform_suffix(platform))]
pub struct BuildFailed {
    pub node: EntityId,
    pub platform: Option<Platform>,
    pub cause: String,
}

fn platform_suffix(platform: &Option<Platform>) -> String {
    platform.map(|p| format!(" for {}", p)).unwrap_or_default()
}

impl BuildFailed {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(format!("failed to build `{}`", self.node));
        if let Some(platform) = self.platform {
            diag = diag.with_context(format!("platform: {}", platform));
        }
        for line in self.cause.lines().take(20) {
            diag = diag.with_context(line.to_string());
        }
        diag.with_suggestion(suggestions::BUILD_FAILED)
    }
}

/// How a node ended.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Built(ArtifactHandle),
    Failed(BuildFailed),
    /// A build-time or runtime predecessor did not succeed.
    Skipped { failed_dependency: EntityId },
    /// The run was cancelled before the node was dispatched.
    Cancelled,
}

impl NodeOutcome {
    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        match self {
            NodeOutcome::Built(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NodeOutcome::Built(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeOutcome::Built(h) if h.fresh => "built",
            NodeOutcome::Built(_) => "fresh",
            NodeOutcome::Failed(_) => "failed",
            NodeOutcome::Skipped { .. } => "skipped",
            NodeOutcome::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_exists_checks_every_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.jar"), "x").unwrap();
        let mut handle = ArtifactHandle {
            node: EntityId::new("demo", "P"),
            fingerprint: "f".into(),
            path: tmp.path().to_path_buf(),
            files: vec![PathBuf::from("a.jar")],
            fresh: true,
            platform: None,
        };
        assert!(handle.exists());
        handle.files.push(PathBuf::from("b.jar"));
        assert!(!handle.exists());
    }

    #[test]
    fn test_build_failed_message() {
        let err = BuildFailed {
            node: EntityId::new("demo", "P"),
            platform: None,
            cause: "exit status: 2".into(),
        };
        assert_eq!(err.to_string(), "failed to build `demo:P`: exit status: 2");
        assert!(err.to_diagnostic().format(false).contains("exit status: 2"));
    }
}
