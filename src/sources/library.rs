//! Fetching library binaries for build inputs.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::entity_id::EntityId;
use crate::core::library::Library;
use crate::sources::cache::KeyedCache;
use crate::sources::source::{ArtifactFetcher, FetchError};

/// Resolves libraries to local files, each at most once per process.
pub struct LibraryResolver {
    fetcher: Arc<dyn ArtifactFetcher>,
    maven_repository: String,
    cache: KeyedCache<EntityId, PathBuf>,
}

impl LibraryResolver {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, maven_repository: impl Into<String>) -> Self {
        LibraryResolver {
            fetcher,
            maven_repository: maven_repository.into(),
            cache: KeyedCache::new(),
        }
    }

    /// Local path of a library's binary, verified against its digest.
    pub fn fetch(&self, id: EntityId, library: &Library) -> Result<PathBuf, FetchError> {
        self.cache.get_or_try_insert_with(id, || {
            let url = library.url(&self.maven_repository);
            tracing::debug!("fetching library {} from {}", id, url);
            self.fetcher.fetch(&url, Some(&library.digest))
        })
    }

    /// URL a library would be fetched from.
    pub fn url(&self, library: &Library) -> String {
        library.url(&self.maven_repository)
    }
}
