//! Test utilities and mocks for quay unit tests.
//!
//! Mock implementations of the fetcher, VCS and builder seams, so that
//! import resolution and the executor can be tested without network access
//! or real compilers.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{MockVcs, SuiteFixture};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     SuiteFixture::new("tools").write(&tmp.path().join("graal"));
//!     let vcs = MockVcs::new()
//!         .with_repo("https://example.org/graal.git", tmp.path().join("graal"));
//!     // Hand `vcs` to an ImportResolver...
//! }
//! ```

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// Re-export fixtures for convenience
pub use fixtures::*;

use crate::builder::external::{BuildError, BuildOutput, BuildRequest, ExternalBuilder};
use crate::core::digest::Digest;
use crate::core::entity_id::EntityId;
use crate::sources::source::{ArtifactFetcher, Checkout, CheckoutError, FetchError, VcsClient};

/// Fetcher serving canned artifacts.
///
/// URLs registered with `with_artifact` return the given path. Anything
/// else is "downloaded" into `dir` as a file named after the last URL
/// segment, containing the URL.
#[derive(Debug)]
pub struct MockFetcher {
    dir: PathBuf,
    artifacts: HashMap<String, PathBuf>,
    failures: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        MockFetcher {
            dir: dir.into(),
            artifacts: HashMap::new(),
            failures: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_artifact(mut self, url: &str, path: impl Into<PathBuf>) -> Self {
        self.artifacts.insert(url.to_string(), path.into());
        self
    }

    /// Make `url` fail with a network error.
    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.failures.insert(url.to_string(), message.to_string());
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ArtifactFetcher for MockFetcher {
    fn fetch(&self, url: &str, _expected: Option<&Digest>) -> Result<PathBuf, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if let Some(message) = self.failures.get(url) {
            return Err(FetchError::Network {
                url: url.to_string(),
                message: message.clone(),
            });
        }
        if let Some(path) = self.artifacts.get(url) {
            return Ok(path.clone());
        }

        let name = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("artifact");
        let path = self.dir.join(name);
        std::fs::create_dir_all(&self.dir).map_err(|source| FetchError::Io {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, url).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// VCS client mapping repository URLs to local directories.
#[derive(Debug, Default)]
pub struct MockVcs {
    repos: HashMap<String, PathBuf>,
    revisions: HashMap<(String, String), (PathBuf, String)>,
    delay: Option<Duration>,
    checkouts: AtomicUsize,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any revision of `url` checks out to `dir`, at that revision.
    pub fn with_repo(mut self, url: &str, dir: impl Into<PathBuf>) -> Self {
        self.repos.insert(url.to_string(), dir.into());
        self
    }

    /// `revision` of `url` checks out to `dir` and reports `precise`.
    pub fn with_revision(
        mut self,
        url: &str,
        revision: &str,
        dir: impl Into<PathBuf>,
        precise: &str,
    ) -> Self {
        self.revisions.insert(
            (url.to_string(), revision.to_string()),
            (dir.into(), precise.to_string()),
        );
        self
    }

    /// Sleep in every checkout, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn checkout_count(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }
}

impl VcsClient for MockVcs {
    fn checkout(&self, repo_url: &str, revision: &str) -> Result<Checkout, CheckoutError> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let key = (repo_url.to_string(), revision.to_string());
        if let Some((path, precise)) = self.revisions.get(&key) {
            return Ok(Checkout {
                path: path.clone(),
                revision: precise.clone(),
            });
        }
        match self.repos.get(repo_url) {
            Some(path) => Ok(Checkout {
                path: path.clone(),
                revision: revision.to_string(),
            }),
            None => Err(CheckoutError::Remote {
                url: repo_url.to_string(),
                message: "repository not found".to_string(),
            }),
        }
    }
}

/// Builder that writes `<name>.out` listing its inputs and records every
/// request it sees.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    fail_on: HashSet<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<BuildRequest>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the build of every node named `name`.
    pub fn fail_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Nodes built so far, in start order.
    pub fn built(&self) -> Vec<EntityId> {
        self.requests.lock().unwrap().iter().map(|r| r.node).collect()
    }

    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of builds that ran at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

impl ExternalBuilder for RecordingBuilder {
    fn name(&self) -> &str {
        "recording"
    }

    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let result = self.produce(request);
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl RecordingBuilder {
    fn produce(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        if self.fail_on.contains(request.node.name()) {
            return Err(BuildError::Tool {
                command: format!("build {}", request.node),
                status: "exit status: 1".to_string(),
                stderr: format!("{}: compilation failed", request.node.name()),
            });
        }

        let out = &request.options.output_dir;
        std::fs::create_dir_all(out).map_err(|source| BuildError::Io {
            path: out.clone(),
            source,
        })?;
        let inputs: Vec<String> = request.inputs.iter().map(|h| h.node.to_string()).collect();
        let file = out.join(format!("{}.out", request.node.name()));
        std::fs::write(&file, inputs.join("\n")).map_err(|source| BuildError::Io {
            path: file.clone(),
            source,
        })?;
        BuildOutput::scan(out.clone())
    }
}

/// Builder that always fails.
#[derive(Debug)]
pub struct FailingBuilder {
    message: String,
}

impl FailingBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        FailingBuilder {
            message: message.into(),
        }
    }
}

impl ExternalBuilder for FailingBuilder {
    fn name(&self) -> &str {
        "failing"
    }

    fn build(&self, _request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        Err(BuildError::Other(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fetcher_writes_unmapped_urls() {
        let tmp = tempfile::TempDir::new().unwrap();
        let fetcher = MockFetcher::new(tmp.path().join("dl"))
            .failing("https://down.example.org/x.jar", "503");

        let path = fetcher.fetch("https://repo.example.org/joni.jar", None).unwrap();
        assert_eq!(path, tmp.path().join("dl/joni.jar"));
        assert!(fetcher.fetch("https://down.example.org/x.jar", None).is_err());
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[test]
    fn test_mock_vcs_reports_precise_revision() {
        let vcs = MockVcs::new()
            .with_repo("https://a.example.org/r.git", "/tmp/a")
            .with_revision("https://a.example.org/r.git", "master", "/tmp/b", "cafe");

        assert_eq!(vcs.checkout("https://a.example.org/r.git", "v1").unwrap().revision, "v1");
        let pinned = vcs.checkout("https://a.example.org/r.git", "master").unwrap();
        assert_eq!(pinned.revision, "cafe");
        assert_eq!(pinned.path, PathBuf::from("/tmp/b"));
        assert!(vcs.checkout("https://b.example.org/r.git", "v1").is_err());
        assert_eq!(vcs.checkout_count(), 3);
    }
}
