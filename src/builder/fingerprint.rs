//! Build fingerprinting for incremental builds.
//!
//! A fingerprint captures every input of one node's build step. When the
//! cached fingerprint matches and the recorded outputs still exist, the
//! recorded artifact is reused instead of calling the builder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::artifact::ArtifactHandle;
use crate::builder::external::{BuildKind, BuildOptions};
use crate::core::entity_id::EntityId;
use crate::core::platform::Platform;
use crate::util::hash::{sha256_tree, Fingerprint};

/// Inputs that decide whether a node must be rebuilt.
#[derive(Debug)]
pub struct FingerprintInputs<'a> {
    pub node: EntityId,
    pub kind: BuildKind,
    pub builder: &'a str,
    /// Only set for platform-specific nodes.
    pub platform: Option<Platform>,
    pub source_dirs: &'a [PathBuf],
    pub predecessors: Vec<&'a str>,
    pub library_digests: Vec<String>,
    pub options: &'a BuildOptions,
}

impl FingerprintInputs<'_> {
    pub fn compute(&self) -> Result<String> {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.node.to_string())
            .update_str(self.kind.as_str())
            .update_str(self.builder)
            .update_opt(self.platform.map(|p| p.to_string()).as_deref());

        for dir in self.source_dirs {
            let tree = sha256_tree(dir)
                .with_context(|| format!("failed to hash sources in {}", dir.display()))?;
            fp.update_str(&tree);
        }
        fp.update_strs(self.predecessors.iter().copied());
        fp.update_strs(self.library_digests.iter().map(String::as_str));

        let options = &self.options;
        for (key, value) in &options.env {
            fp.update_str(key).update_str(value);
        }
        fp.update_strs(options.results.iter().map(String::as_str))
            .update_str(&options.output_dir.display().to_string())
            .update_opt(options.language_version.map(|v| v.to_string()).as_deref())
            .update_opt(options.main_class.as_deref());

        Ok(fp.finish())
    }
}

/// Cache key of one node on one platform.
pub fn unit_key(node: EntityId, platform: Option<Platform>) -> String {
    match platform {
        Some(p) => format!("{}@{}", node, p),
        None => node.to_string(),
    }
}

/// On-disk record of the last successful build of every node.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FingerprintCache {
    pub artifacts: BTreeMap<String, ArtifactHandle>,
}

impl FingerprintCache {
    /// Load fingerprint cache from a file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(FingerprintCache::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cache: FingerprintCache = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cache)
    }

    /// Load, treating an unreadable cache as empty.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("ignoring fingerprint cache: {:#}", e);
                FingerprintCache::default()
            }
        }
    }

    /// Save fingerprint cache to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// The recorded artifact, if its fingerprint matches and it still exists.
    pub fn fresh(&self, key: &str, fingerprint: &str) -> Option<ArtifactHandle> {
        let cached = self.artifacts.get(key)?;
        if cached.fingerprint != fingerprint || !cached.exists() {
            return None;
        }
        let mut handle = cached.clone();
        handle.fresh = false;
        Some(handle)
    }

    pub fn record(&mut self, key: String, handle: ArtifactHandle) {
        self.artifacts.insert(key, handle);
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
