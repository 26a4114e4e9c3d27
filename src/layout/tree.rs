//! The composed destination tree and its materialization.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::layout::LayoutError;
use crate::util::hash::Fingerprint;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> LayoutError + '_ {
    move |source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Destination files of a layout and where each one is copied from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    entries: BTreeMap<PathBuf, PathBuf>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `source` at `destination`, returning the source it replaced.
    pub fn insert(&mut self, destination: PathBuf, source: PathBuf) -> Option<PathBuf> {
        self.entries.insert(destination, source)
    }

    pub fn get(&self, destination: &Path) -> Option<&Path> {
        self.entries.get(destination).map(PathBuf::as_path)
    }

    pub fn contains(&self, destination: &Path) -> bool {
        self.entries.contains_key(destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(destination, source)` pairs sorted by destination.
    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, PathBuf> {
        self.entries.iter()
    }

    /// Destination paths, sorted.
    pub fn destinations(&self) -> Vec<&Path> {
        self.entries.keys().map(PathBuf::as_path).collect()
    }

    /// Hash of every destination and the bytes it will hold.
    pub fn digest(&self) -> Result<String, LayoutError> {
        let mut fp = Fingerprint::new();
        for (dest, source) in &self.entries {
            let data = std::fs::read(source).map_err(io_err(source))?;
            fp.update_str(&dest.to_string_lossy())
                .update_str(&crate::util::hash::sha256_bytes(&data));
        }
        Ok(fp.finish())
    }

    /// Write the tree to `dir`, replacing whatever was there.
    ///
    /// Files are staged in a sibling directory first, so `dir` never holds
    /// a half-written tree.
    pub fn materialize(&self, dir: &Path) -> Result<(), LayoutError> {
        let parent = dir.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".quay-layout-")
            .tempdir_in(parent)
            .map_err(io_err(parent))?;

        for (dest, source) in &self.entries {
            let target = staging.path().join(dest);
            if let Some(p) = target.parent() {
                std::fs::create_dir_all(p).map_err(io_err(p))?;
            }
            std::fs::copy(source, &target).map_err(io_err(source))?;
        }

        if dir.exists() {
            std::fs::remove_dir_all(dir).map_err(io_err(dir))?;
        }
        std::fs::rename(staging.path(), dir).map_err(io_err(dir))?;
        tracing::debug!("materialized {} files into {}", self.entries.len(), dir.display());
        Ok(())
    }
}
