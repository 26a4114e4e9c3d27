//! Import resolution and dependency graph construction.
//!
//! Everything here runs before any build step and either produces a frozen
//! `GlobalManifest` plus a validated `DependencyGraph`, or fails with a
//! structural `ResolveError`.

pub mod errors;
pub mod graph;
pub mod imports;
pub mod namespace;

pub use errors::{Attempt, ResolveError, VersionPin};
pub use graph::{build_graph, topo_sort, DependencyEdge, DependencyGraph, EdgeKind, GraphNode};
pub use imports::ImportResolver;
pub use namespace::merge_namespace;

use crate::core::global::{GlobalManifest, ResolvedSuite};

/// Resolve every import of `root` and merge the results.
pub fn load_global(
    resolver: &ImportResolver,
    root: ResolvedSuite,
) -> Result<GlobalManifest, ResolveError> {
    let loaded = resolver.resolve_all(root)?;
    merge_namespace(loaded)
}
