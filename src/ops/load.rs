//! Loading the root suite and everything it imports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::global::{GlobalManifest, ResolvedSuite};
use crate::core::workspace::Workspace;
use crate::resolver::graph::{build_graph, DependencyGraph};
use crate::resolver::{load_global, ImportResolver};
use crate::sources::{ArtifactFetcher, GitClient, HttpFetcher, VcsClient};
use crate::util::GlobalContext;

/// Options shared by every command that loads a suite.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Path to `Suite.toml`; searched upward from the working directory
    /// when unset.
    pub manifest_path: Option<PathBuf>,

    /// Only use path imports and already cached downloads.
    pub offline: bool,
}

/// A loaded, resolved and linked suite.
pub struct Session {
    pub workspace: Workspace,
    pub global: GlobalManifest,
    pub graph: DependencyGraph,
    /// Shared with library fetching during builds.
    pub fetcher: Arc<dyn ArtifactFetcher>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workspace", &self.workspace)
            .field("suites", &self.global.suites().len())
            .field("nodes", &self.graph.len())
            .finish()
    }
}

/// Find the manifest, resolve imports with git and HTTP, and build the graph.
pub fn load(ctx: &GlobalContext, opts: &LoadOptions) -> Result<Session> {
    let manifest_path = match &opts.manifest_path {
        Some(path) => path.clone(),
        None => ctx.find_manifest()?,
    };
    let workspace = Workspace::new(&manifest_path, ctx)?;
    let offline = opts.offline || workspace.config().net.offline;

    let fetcher: Arc<dyn ArtifactFetcher> = Arc::new(
        HttpFetcher::new(ctx.download_cache_dir(), offline).context("failed to set up downloads")?,
    );
    let vcs: Arc<dyn VcsClient> = Arc::new(GitClient::new(ctx.git_cache_dir(), offline));

    load_with(workspace, vcs, fetcher, &ctx.suites_cache_dir(), offline)
}

/// Resolve and link a workspace through the given sources.
pub fn load_with(
    workspace: Workspace,
    vcs: Arc<dyn VcsClient>,
    fetcher: Arc<dyn ArtifactFetcher>,
    suites_dir: &Path,
    offline: bool,
) -> Result<Session> {
    let resolver =
        ImportResolver::new(vcs, fetcher.clone(), suites_dir.to_path_buf()).offline(offline);
    let root = ResolvedSuite {
        suite: workspace.root_suite().clone(),
        revision: None,
        prebuilt: false,
    };

    let global = load_global(&resolver, root)?;
    tracing::debug!(
        "loaded {} suites: {}",
        global.suites().len(),
        global.suites().iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
    );
    let graph = build_graph(&global)?;
    graph.topo_sort()?;

    Ok(Session {
        workspace,
        global,
        graph,
        fetcher,
    })
}
