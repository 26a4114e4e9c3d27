//! Import resolution: locating imported suites at their pinned versions.
//!
//! Imports are resolved breadth-first from the root suite. Every import at
//! one depth is fetched in parallel; the next depth is the union of the
//! imports of the suites just loaded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::global::ResolvedSuite;
use crate::core::import::{Import, ImportLocation, LocationKind};
use crate::core::manifest::MANIFEST_NAME;
use crate::core::suite::Suite;
use crate::resolver::errors::{Attempt, ResolveError, VersionPin};
use crate::sources::cache::KeyedCache;
use crate::sources::http::unpack_tar_gz;
use crate::sources::source::{ArtifactFetcher, VcsClient};
use crate::util::fs::sanitize_dir_name;

/// Resolves imports through a `VcsClient` and an `ArtifactFetcher`.
pub struct ImportResolver {
    vcs: Arc<dyn VcsClient>,
    fetcher: Arc<dyn ArtifactFetcher>,
    /// Where binary suite archives are unpacked
    suites_dir: PathBuf,
    offline: bool,
    cache: KeyedCache<(String, String), ResolvedSuite>,
}

/// An import waiting to be resolved, with the suite that declared it.
struct Pending {
    import: Import,
    declared_by: String,
    importer_root: PathBuf,
}

impl ImportResolver {
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        fetcher: Arc<dyn ArtifactFetcher>,
        suites_dir: PathBuf,
    ) -> Self {
        ImportResolver {
            vcs,
            fetcher,
            suites_dir,
            offline: false,
            cache: KeyedCache::new(),
        }
    }

    /// Skip remote candidates.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn cache_key(import: &Import, importer_root: &Path) -> (String, String) {
        let version = match (&import.version, import.locations.first()) {
            (Some(version), _) => version.clone(),
            (None, Some(location)) => {
                format!("path:{}", importer_root.join(&location.url).display())
            }
            (None, None) => String::new(),
        };
        (import.name.clone(), version)
    }

    /// Resolve one import: the first candidate location that yields a suite
    /// with the expected name wins.
    pub fn resolve(
        &self,
        import: &Import,
        importer_root: &Path,
    ) -> Result<ResolvedSuite, ResolveError> {
        self.cache
            .get_or_try_insert_with(Self::cache_key(import, importer_root), || {
                self.resolve_uncached(import, importer_root)
            })
    }

    fn resolve_uncached(
        &self,
        import: &Import,
        importer_root: &Path,
    ) -> Result<ResolvedSuite, ResolveError> {
        let mut attempts = Vec::new();

        for location in &import.locations {
            if self.offline && location.kind.is_remote() {
                attempts.push(Attempt {
                    location: location.to_string(),
                    cause: "skipped in offline mode".to_string(),
                });
                continue;
            }

            match self.try_location(import, location, importer_root) {
                Ok(resolved) => {
                    tracing::info!(
                        "Imported suite `{}` at {} from {}",
                        import.name,
                        import.version_label(),
                        location
                    );
                    return Ok(resolved);
                }
                Err(cause) => {
                    tracing::debug!("import `{}` from {} failed: {}", import.name, location, cause);
                    attempts.push(Attempt {
                        location: location.to_string(),
                        cause,
                    });
                }
            }
        }

        Err(ResolveError::ImportUnavailable {
            suite: import.name.clone(),
            version: import.version_label().to_string(),
            attempts,
        })
    }

    fn try_location(
        &self,
        import: &Import,
        location: &ImportLocation,
        importer_root: &Path,
    ) -> Result<ResolvedSuite, String> {
        let pinned = || {
            import
                .version
                .as_deref()
                .ok_or_else(|| format!("{} locations need a pinned version", location.kind))
        };
        let with_subdir = |root: PathBuf| {
            if import.subdir {
                root.join(&import.name)
            } else {
                root
            }
        };

        let (root, revision, prebuilt) = match location.kind {
            LocationKind::Git => {
                let checkout = self
                    .vcs
                    .checkout(&location.url, pinned()?)
                    .map_err(|e| e.to_string())?;
                (with_subdir(checkout.path), Some(checkout.revision), false)
            }
            LocationKind::Binary => {
                let version = pinned()?;
                let root = self.fetch_binary(&import.name, version, &location.url)?;
                (root, Some(version.to_string()), true)
            }
            LocationKind::Path => {
                let path = Path::new(&location.url);
                let root = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    importer_root.join(path)
                };
                (with_subdir(root), None, false)
            }
        };

        let suite = Suite::load_dir(&root).map_err(|e| e.to_string())?;
        if suite.name != import.name {
            return Err(format!(
                "{} declares suite `{}`, not `{}`",
                root.join(MANIFEST_NAME).display(),
                suite.name,
                import.name
            ));
        }

        Ok(ResolvedSuite {
            suite: Arc::new(suite),
            revision,
            prebuilt,
        })
    }

    /// Fetch `<base>/<name>/<version>/<name>-<version>.tar.gz` and unpack it,
    /// or use the location directly when the fetcher hands back a directory.
    fn fetch_binary(&self, name: &str, version: &str, base: &str) -> Result<PathBuf, String> {
        let url = format!(
            "{}/{name}/{version}/{name}-{version}.tar.gz",
            base.trim_end_matches('/')
        );
        let fetched = self.fetcher.fetch(&url, None).map_err(|e| e.to_string())?;
        if fetched.is_dir() {
            return Ok(fetched);
        }

        let dest = self
            .suites_dir
            .join(format!("{}-{}", name, sanitize_dir_name(version)));
        if dest.join(MANIFEST_NAME).is_file() {
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.suites_dir).map_err(|e| e.to_string())?;
        let staging = tempfile::TempDir::new_in(&self.suites_dir).map_err(|e| e.to_string())?;
        unpack_tar_gz(&fetched, staging.path())
            .map_err(|e| format!("failed to unpack {}: {}", fetched.display(), e))?;
        let staged = staging.keep();
        if let Err(e) = std::fs::rename(&staged, &dest) {
            let _ = std::fs::remove_dir_all(&staged);
            if !dest.join(MANIFEST_NAME).is_file() {
                return Err(format!("failed to move unpacked suite to {}: {}", dest.display(), e));
            }
        }
        Ok(dest)
    }

    /// Resolve the transitive imports of `root`. The result is in load
    /// order: the root first, then each depth in declaration order.
    pub fn resolve_all(&self, root: ResolvedSuite) -> Result<Vec<ResolvedSuite>, ResolveError> {
        check_declared_co_versions(&root.suite)?;

        let root_name = root.suite.name.clone();
        let mut pins: HashMap<String, VersionPin> = HashMap::new();
        let mut frontier: Vec<Pending> = pending_imports(&root.suite);
        let mut loaded = vec![root];

        while !frontier.is_empty() {
            let mut batch = Vec::new();
            for pending in frontier {
                let import = &pending.import;
                if import.name == root_name {
                    tracing::debug!(
                        "`{}` imports the root suite back; using the root",
                        pending.declared_by
                    );
                    continue;
                }

                let pin = VersionPin {
                    import: import.name.clone(),
                    version: import.version_label().to_string(),
                    declared_by: pending.declared_by.clone(),
                };
                match pins.get(&import.name) {
                    // Unpinned path imports may point at different copies;
                    // the namespace merge compares their content.
                    Some(existing)
                        if existing.version == pin.version && import.version.is_none() =>
                    {
                        batch.push(pending);
                    }
                    Some(existing) if existing.version == pin.version => continue,
                    Some(existing) => {
                        let reason = "the same suite is imported at two different versions";
                        return Err(ResolveError::VersionSkew {
                            pins: vec![existing.clone(), pin],
                            reason: Some(reason.to_string()),
                        });
                    }
                    None => {
                        pins.insert(import.name.clone(), pin);
                        batch.push(pending);
                    }
                }
            }

            let results: Vec<Result<ResolvedSuite, ResolveError>> = batch
                .par_iter()
                .map(|p| self.resolve(&p.import, &p.importer_root))
                .collect();

            let mut next = Vec::new();
            for result in results {
                let resolved = result?;
                check_declared_co_versions(&resolved.suite)?;
                next.extend(pending_imports(&resolved.suite));
                loaded.push(resolved);
            }
            frontier = next;
        }

        check_resolved_co_versions(&loaded)?;
        Ok(loaded)
    }
}

fn pending_imports(suite: &Suite) -> Vec<Pending> {
    suite
        .imports
        .iter()
        .map(|import| Pending {
            import: import.clone(),
            declared_by: suite.name.clone(),
            importer_root: suite.root.clone(),
        })
        .collect()
}

/// Co-versioned imports must be pinned to one version before anything is
/// fetched.
fn check_declared_co_versions(suite: &Suite) -> Result<(), ResolveError> {
    for group in &suite.co_versions {
        let pins: Vec<VersionPin> = group
            .imports
            .iter()
            .filter_map(|name| suite.import(name))
            .map(|import| VersionPin {
                import: import.name.clone(),
                version: import.version_label().to_string(),
                declared_by: suite.name.clone(),
            })
            .collect();

        if pins.windows(2).any(|w| w[0].version != w[1].version) {
            return Err(ResolveError::VersionSkew {
                pins,
                reason: group.reason.clone(),
            });
        }
    }
    Ok(())
}

/// After resolution, co-versioned imports must also have landed on one
/// precise revision.
fn check_resolved_co_versions(loaded: &[ResolvedSuite]) -> Result<(), ResolveError> {
    let by_name: HashMap<&str, &ResolvedSuite> = loaded.iter().map(|r| (r.name(), r)).collect();

    for declaring in loaded {
        for group in &declaring.suite.co_versions {
            let pins: Vec<VersionPin> = group
                .imports
                .iter()
                .filter_map(|name| {
                    let resolved = by_name.get(name.as_str())?;
                    let declared = declaring.suite.import(name)?;
                    Some(VersionPin {
                        import: name.clone(),
                        version: resolved
                            .revision
                            .clone()
                            .unwrap_or_else(|| declared.version_label().to_string()),
                        declared_by: declaring.suite.name.clone(),
                    })
                })
                .collect();

            if pins.windows(2).any(|w| w[0].version != w[1].version) {
                return Err(ResolveError::VersionSkew {
                    pins,
                    reason: group.reason.clone(),
                });
            }
        }
    }
    Ok(())
}
