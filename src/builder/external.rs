//! The seam between the executor and the tools that actually build things.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::archive::ArchiveBuilder;
use crate::builder::artifact::ArtifactHandle;
use crate::builder::command::CommandBuilder;
use crate::core::entity_id::EntityId;
use crate::core::platform::Platform;
use crate::core::project::LanguageVersion;
use crate::util::config::Config;
use crate::util::fs::list_files;

/// Which kind of external builder handles a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    Managed,
    Native,
    Data,
    Archive,
}

impl BuildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildKind::Managed => "managed",
            BuildKind::Native => "native",
            BuildKind::Data => "data",
            BuildKind::Archive => "archive",
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildOptions {
    pub platform: Option<Platform>,
    pub output_dir: PathBuf,
    /// Build environment with `<path:…>` placeholders already substituted.
    pub env: BTreeMap<String, String>,
    /// Declared outputs relative to `output_dir`, expanded for the platform.
    pub results: Vec<String>,
    pub language_version: Option<LanguageVersion>,
    pub main_class: Option<String>,
}

/// Everything a builder needs to produce one node's artifact.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest {
    pub node: EntityId,
    pub kind: BuildKind,
    /// Directory of the project, or the suite root for distributions.
    pub base_dir: PathBuf,
    /// Absolute source directories.
    pub source_dirs: Vec<PathBuf>,
    /// Artifacts of build-time predecessors, in declaration order.
    pub inputs: Vec<ArtifactHandle>,
    /// Fetched library files.
    pub libraries: Vec<PathBuf>,
    /// Artifacts of annotation processors (also present in `inputs`).
    pub processors: Vec<PathBuf>,
    pub options: BuildOptions,
}

/// What a builder produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Root of the artifact: a directory or a single file.
    pub path: PathBuf,
    /// Files of the artifact, relative to `path` when it is a directory.
    pub files: Vec<PathBuf>,
}

impl BuildOutput {
    /// Output rooted at `path`, listing whatever files are there.
    pub fn scan(path: PathBuf) -> Result<Self, BuildError> {
        let files = if path.is_dir() {
            list_files(&path).map_err(|e| BuildError::Io {
                path: path.clone(),
                source: std::io::Error::other(format!("{:#}", e)),
            })?
        } else {
            Vec::new()
        };
        Ok(BuildOutput { path, files })
    }
}

/// Error reported by an external builder.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("`{command}` exited with {status}{}", stderr_suffix(stderr))]
    Tool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("no {kind} builder is configured")]
    NoBuilder { kind: BuildKind },

    #[error("declared result `{}` was not produced", path.display())]
    MissingOutput { path: PathBuf },

    #[error("failed to fetch library: {0}")]
    Library(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// An external tool that turns sources and inputs into an artifact.
pub trait ExternalBuilder: Send + Sync {
    /// Name mixed into fingerprints; change it when outputs would change.
    fn name(&self) -> &str;

    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError>;
}

/// Data projects: the project directory is the artifact.
#[derive(Debug, Default)]
pub struct PassThroughBuilder;

impl ExternalBuilder for PassThroughBuilder {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        if !request.base_dir.is_dir() {
            return Err(BuildError::MissingOutput {
                path: request.base_dir.clone(),
            });
        }
        BuildOutput::scan(request.base_dir.clone())
    }
}

/// Builders by kind.
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: HashMap<BuildKind, Arc<dyn ExternalBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass-through and archive builders, plus a command builder for every
    /// kind configured under `[builders]`.
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = BuilderRegistry::new();
        registry.register(BuildKind::Data, Arc::new(PassThroughBuilder));
        registry.register(BuildKind::Archive, Arc::new(ArchiveBuilder));
        for kind in [BuildKind::Managed, BuildKind::Native] {
            if let Some(command) = config.builders.get(kind.as_str()) {
                registry.register(kind, Arc::new(CommandBuilder::new(kind, command.clone())));
            }
        }
        registry
    }

    pub fn register(&mut self, kind: BuildKind, builder: Arc<dyn ExternalBuilder>) {
        self.builders.insert(kind, builder);
    }

    pub fn get(&self, kind: BuildKind) -> Option<&Arc<dyn ExternalBuilder>> {
        self.builders.get(&kind)
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().collect();
        kinds.sort();
        f.debug_struct("BuilderRegistry").field("kinds", &kinds).finish()
    }
}
