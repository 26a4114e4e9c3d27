//! Fetcher and VCS traits: the seams between quay and the outside world.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::digest::{Digest, DigestAlgorithm};

/// Error fetching a remote artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to download {url}: {message}")]
    Network { url: String, message: String },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: Digest,
        actual: String,
    },

    #[error("cannot verify {algorithm} digest of {url}; only sha256 is supported")]
    UnsupportedDigest {
        url: String,
        algorithm: DigestAlgorithm,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid url `{0}`")]
    InvalidUrl(String),

    #[error("offline mode: not fetching {0}")]
    Offline(String),
}

/// Error checking out a repository.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("failed to clone or update {url}: {message}")]
    Remote { url: String, message: String },

    #[error("revision `{revision}` not found in {url}")]
    RevisionNotFound { url: String, revision: String },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("offline mode: {0} is not checked out locally")]
    Offline(String),
}

/// Downloads artifacts, optionally verifying a digest.
///
/// The returned path is a local file (or directory, for local URLs) that
/// stays valid for the rest of the process.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, url: &str, expected: Option<&Digest>) -> Result<PathBuf, FetchError>;
}

/// A checked-out working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub path: PathBuf,
    /// The precise revision the tree is at.
    pub revision: String,
}

/// Checks out repositories at pinned revisions.
pub trait VcsClient: Send + Sync {
    fn checkout(&self, repo_url: &str, revision: &str) -> Result<Checkout, CheckoutError>;
}
