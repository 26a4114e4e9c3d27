//! Expanding layout rules into an `OutputTree`.
//!
//! Rules apply in declaration order and later entries overwrite earlier
//! ones at the same destination. Globs expand against the declaring
//! suite's directory with `*` never crossing a `/`; two glob matches of one
//! rule landing on the same destination are a conflict.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::builder::artifact::ArtifactHandle;
use crate::core::entity_id::EntityId;
use crate::core::global::GlobalManifest;
use crate::core::layout_rule::{LayoutRule, LayoutSource};
use crate::core::placeholder;
use crate::core::platform::Platform;
use crate::layout::tree::OutputTree;
use crate::layout::LayoutError;
use crate::util::fs::list_files;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Artifacts available to `ArtifactRef` sources.
pub trait ArtifactLookup {
    fn artifact(&self, id: EntityId) -> Option<&ArtifactHandle>;
}

impl ArtifactLookup for BTreeMap<EntityId, ArtifactHandle> {
    fn artifact(&self, id: EntityId) -> Option<&ArtifactHandle> {
        self.get(&id)
    }
}

impl ArtifactLookup for HashMap<EntityId, ArtifactHandle> {
    fn artifact(&self, id: EntityId) -> Option<&ArtifactHandle> {
        self.get(&id)
    }
}

/// Composes distribution layouts against the merged namespace.
///
/// Holds only shared references, so one composer can serve every platform.
#[derive(Debug, Clone, Copy)]
pub struct LayoutComposer<'a> {
    global: &'a GlobalManifest,
}

/// State of one rule while it expands.
struct RuleTarget<'r> {
    distribution: EntityId,
    /// Destination with placeholders expanded, trailing `/` removed.
    destination: PathBuf,
    directory: bool,
    /// Sources that glob matches placed, by destination.
    globbed: HashMap<PathBuf, PathBuf>,
    tree: &'r mut OutputTree,
}

impl RuleTarget<'_> {
    /// Destination of `name` (a file or directory name) under this rule.
    fn place(&self, name: &Path) -> PathBuf {
        if self.directory {
            self.destination.join(name)
        } else {
            self.destination.clone()
        }
    }

    fn put(&mut self, dest: PathBuf, source: PathBuf, from_glob: bool) -> Result<(), LayoutError> {
        if from_glob {
            if let Some(first) = self.globbed.get(&dest) {
                return Err(LayoutError::LayoutConflict {
                    distribution: self.distribution,
                    destination: dest,
                    first: first.clone(),
                    second: source,
                });
            }
            self.globbed.insert(dest.clone(), source.clone());
        }
        if let Some(previous) = self.tree.insert(dest.clone(), source) {
            tracing::debug!(
                "{}: `{}` overrides {}",
                self.distribution,
                dest.display(),
                previous.display()
            );
        }
        Ok(())
    }

    /// Place a file, or every file below a directory, rooted at `root`.
    fn put_path(
        &mut self,
        source: &Path,
        root: PathBuf,
        from_glob: bool,
    ) -> Result<(), LayoutError> {
        if source.is_dir() {
            for file in files_below(source)? {
                self.put(root.join(&file), source.join(&file), from_glob)?;
            }
            Ok(())
        } else {
            self.put(root, source.to_path_buf(), from_glob)
        }
    }
}

fn files_below(dir: &Path) -> Result<Vec<PathBuf>, LayoutError> {
    list_files(dir).map_err(|e| LayoutError::Io {
        path: dir.to_path_buf(),
        source: std::io::Error::other(format!("{:#}", e)),
    })
}

fn file_name(path: &Path) -> PathBuf {
    path.file_name().map(PathBuf::from).unwrap_or_default()
}

impl<'a> LayoutComposer<'a> {
    pub fn new(global: &'a GlobalManifest) -> Self {
        LayoutComposer { global }
    }

    /// Expand every layout rule of `distribution` for `platform`.
    pub fn compose(
        &self,
        distribution: EntityId,
        platform: Option<Platform>,
        artifacts: &dyn ArtifactLookup,
    ) -> Result<OutputTree, LayoutError> {
        let mut tree = OutputTree::new();
        let (Some(dist), Some(resolved)) = (
            self.global.distribution(distribution),
            self.global.suite_of(distribution),
        ) else {
            return Ok(tree);
        };
        let suite_root = &resolved.suite.root;

        for rule in &dist.layout {
            self.apply_rule(distribution, rule, platform, suite_root, artifacts, &mut tree)?;
        }
        tracing::debug!("composed {} entries for {}", tree.len(), distribution);
        Ok(tree)
    }

    fn apply_rule(
        &self,
        distribution: EntityId,
        rule: &LayoutRule,
        platform: Option<Platform>,
        suite_root: &Path,
        artifacts: &dyn ArtifactLookup,
        tree: &mut OutputTree,
    ) -> Result<(), LayoutError> {
        let expand = |text: &str| {
            placeholder::expand_for_platform(text, platform)
                .map_err(|source| LayoutError::Placeholder { distribution, source })
        };

        let destination = expand(&rule.destination)?;
        let destination = destination.trim_end_matches('/');
        let destination = if destination == "." { "" } else { destination };
        let mut target = RuleTarget {
            distribution,
            destination: PathBuf::from(destination),
            directory: rule.is_directory(),
            globbed: HashMap::new(),
            tree,
        };

        for source in &rule.sources {
            match source {
                LayoutSource::Literal { path } => {
                    let full = suite_root.join(expand(path)?);
                    if !full.exists() {
                        return Err(LayoutError::MissingSource { distribution, path: full });
                    }
                    let root = target.place(&file_name(&full));
                    target.put_path(&full, root, false)?;
                }
                LayoutSource::Glob { pattern, exclude } => {
                    let pattern = expand(pattern)?;
                    let excludes = exclude
                        .iter()
                        .map(|e| {
                            Pattern::new(e).map_err(|err| LayoutError::Pattern {
                                distribution,
                                pattern: e.clone(),
                                message: err.to_string(),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    let matches = glob_matches(distribution, suite_root, &pattern)?;
                    if matches.is_empty() {
                        tracing::warn!(
                            "{}: layout pattern `{}` matches nothing",
                            distribution,
                            pattern
                        );
                    }
                    for relative in matches {
                        if is_excluded(&relative, &excludes) {
                            continue;
                        }
                        let full = suite_root.join(&relative);
                        if full.is_dir() {
                            let root = target.place(&file_name(&relative));
                            for file in files_below(&full)? {
                                if is_excluded(&relative.join(&file), &excludes) {
                                    continue;
                                }
                                target.put(root.join(&file), full.join(&file), true)?;
                            }
                        } else {
                            let dest = target.place(&file_name(&relative));
                            target.put(dest, full, true)?;
                        }
                    }
                }
                LayoutSource::ArtifactRef { reference, path } => {
                    let not_built = || LayoutError::ArtifactNotBuilt {
                        distribution,
                        reference: reference.to_string(),
                    };
                    let id = self
                        .global
                        .resolve(distribution.suite(), reference)
                        .map_err(|_| not_built())?;
                    let handle = artifacts.artifact(id).ok_or_else(not_built)?;

                    match path {
                        Some(sub) => {
                            let full = handle.root().join(expand(sub)?);
                            if !full.exists() {
                                return Err(LayoutError::MissingSource { distribution, path: full });
                            }
                            let root = target.place(&file_name(&full));
                            target.put_path(&full, root, false)?;
                        }
                        None if handle.root().is_dir() => {
                            let files = if handle.files.is_empty() {
                                files_below(handle.root())?
                            } else {
                                handle.files.clone()
                            };
                            // A directory artifact contributes its contents.
                            for file in files {
                                let dest = target.destination.join(&file);
                                target.put(dest, handle.root().join(&file), false)?;
                            }
                        }
                        None => {
                            let root = target.place(&file_name(handle.root()));
                            target.put(root, handle.root().to_path_buf(), false)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Suite-relative paths matching `pattern`, sorted.
fn glob_matches(
    distribution: EntityId,
    suite_root: &Path,
    pattern: &str,
) -> Result<Vec<PathBuf>, LayoutError> {
    let escaped_root = Pattern::escape(&suite_root.to_string_lossy());
    let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
    let paths = glob::glob_with(&full, MATCH_OPTIONS).map_err(|e| LayoutError::Pattern {
        distribution,
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| LayoutError::Io {
            path: e.path().to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
        if let Ok(relative) = path.strip_prefix(suite_root) {
            matches.push(relative.to_path_buf());
        }
    }
    matches.sort();
    Ok(matches)
}

/// Whether `relative` or one of its parent directories matches an exclude.
fn is_excluded(relative: &Path, excludes: &[Pattern]) -> bool {
    relative
        .ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .any(|p| excludes.iter().any(|e| e.matches_path_with(p, MATCH_OPTIONS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::global::ResolvedSuite;
    use crate::core::platform::{Arch, Os};
    use crate::resolver::namespace::merge_namespace;
    use crate::test_support::SuiteFixture;
    use tempfile::TempDir;

    const LINUX: Platform = Platform {
        os: Os::Linux,
        arch: Arch::Amd64,
    };

    fn global(tmp: &TempDir, fixture: SuiteFixture) -> GlobalManifest {
        let suite = fixture.load(&tmp.path().join("suite"));
        merge_namespace(vec![ResolvedSuite::local(suite)]).unwrap()
    }

    fn dist(name: &str, layout: &str) -> String {
        format!("[[distribution]]\nname = \"{name}\"\n{layout}")
    }

    fn destinations(tree: &OutputTree) -> Vec<String> {
        tree.destinations().iter().map(|p| p.display().to_string()).collect()
    }

    fn no_artifacts() -> BTreeMap<EntityId, ArtifactHandle> {
        BTreeMap::new()
    }

    #[test]
    fn test_glob_with_exclude() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .file("lib/a.rb", "a")
                .file("lib/b.rb", "b")
                .file("lib/internal.rb", "internal")
                .file("lib/nested/c.rb", "c")
                .raw(&dist(
                    "HOME",
                    "\n[[distribution.layout]]\ndest = \"lib/\"\n\
                     sources = [{ source = \"file\", path = \"lib/*.rb\", \
                     exclude = [\"lib/internal.rb\"] }]\n",
                )),
        );

        let tree = LayoutComposer::new(&g)
            .compose(EntityId::new("ruby", "HOME"), None, &no_artifacts())
            .unwrap();
        assert_eq!(destinations(&tree), ["lib/a.rb", "lib/b.rb"]);
    }

    #[test]
    fn test_literal_rename_and_later_rule_wins() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .file("README.md", "readme")
                .file("doc/README.md", "doc readme")
                .file("bin/ruby", "#!/bin/sh")
                .raw(&dist(
                    "HOME",
                    "\n[[distribution.layout]]\ndest = \"./\"\n\
                     sources = [\"file:README.md\", \"file:bin\"]\n\
                     \n[[distribution.layout]]\ndest = \"README.md\"\n\
                     sources = [\"file:doc/README.md\"]\n\
                     \n[[distribution.layout]]\ndest = \"docs/index.md\"\n\
                     sources = [\"file:README.md\"]\n",
                )),
        );

        let tree = LayoutComposer::new(&g)
            .compose(EntityId::new("ruby", "HOME"), None, &no_artifacts())
            .unwrap();
        assert_eq!(destinations(&tree), ["README.md", "bin/ruby", "docs/index.md"]);
        assert!(tree.get(Path::new("README.md")).unwrap().ends_with("doc/README.md"));
    }

    #[test]
    fn test_two_globs_in_one_rule_conflict() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .file("a/x.txt", "a")
                .file("b/x.txt", "b")
                .raw(&dist(
                    "HOME",
                    "\n[[distribution.layout]]\ndest = \"out/\"\n\
                     sources = [\"file:a/*.txt\", \"file:b/*.txt\"]\n",
                )),
        );

        let err = LayoutComposer::new(&g)
            .compose(EntityId::new("ruby", "HOME"), None, &no_artifacts())
            .unwrap_err();
        match err {
            LayoutError::LayoutConflict { destination, .. } => {
                assert_eq!(destination, PathBuf::from("out/x.txt"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_globs_in_separate_rules_overwrite() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .file("a/x.txt", "a")
                .file("b/x.txt", "b")
                .raw(&dist(
                    "HOME",
                    "\n[[distribution.layout]]\ndest = \"out/\"\nsources = [\"file:a/*.txt\"]\n\
                     \n[[distribution.layout]]\ndest = \"out/\"\nsources = [\"file:b/*.txt\"]\n",
                )),
        );

        let tree = LayoutComposer::new(&g)
            .compose(EntityId::new("ruby", "HOME"), None, &no_artifacts())
            .unwrap();
        assert!(tree.get(Path::new("out/x.txt")).unwrap().ends_with("b/x.txt"));
    }

    #[test]
    fn test_artifact_ref_with_platform_placeholder() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .raw("[[project]]\nname = \"cext\"\nkind = \"native\"\n")
                .raw(&dist(
                    "SUPPORT",
                    "platform-dependent = true\n\n[[distribution.layout]]\ndest = \"lib/cext/\"\n\
                     sources = [\"dependency:cext/<lib:truffleruby>\"]\n",
                )),
        );
        let out = tmp.path().join("cext-out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("libtruffleruby.so"), "elf").unwrap();

        let composer = LayoutComposer::new(&g);
        let support = EntityId::new("ruby", "SUPPORT");
        assert!(matches!(
            composer.compose(support, Some(LINUX), &no_artifacts()),
            Err(LayoutError::ArtifactNotBuilt { .. })
        ));

        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            EntityId::new("ruby", "cext"),
            ArtifactHandle {
                node: EntityId::new("ruby", "cext"),
                fingerprint: "f".into(),
                path: out.clone(),
                files: vec![PathBuf::from("libtruffleruby.so")],
                fresh: true,
                platform: Some(LINUX),
            },
        );
        let tree = composer.compose(support, Some(LINUX), &artifacts).unwrap();
        assert_eq!(destinations(&tree), ["lib/cext/libtruffleruby.so"]);

        assert!(matches!(
            composer.compose(support, None, &artifacts),
            Err(LayoutError::Placeholder { .. })
        ));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            SuiteFixture::new("ruby")
                .file("lib/z.rb", "z")
                .file("lib/a.rb", "a")
                .file("tool/gen/x.rb", "x")
                .raw(&dist(
                    "HOME",
                    "\n[[distribution.layout]]\ndest = \"./\"\n\
                     sources = [\"file:lib/*.rb\", \"file:tool/*\"]\n",
                )),
        );
        let composer = LayoutComposer::new(&g);
        let id = EntityId::new("ruby", "HOME");

        let first = composer.compose(id, None, &no_artifacts()).unwrap();
        let second = composer.compose(id, None, &no_artifacts()).unwrap();
        assert_eq!(first, second);
        assert_eq!(destinations(&first), ["a.rb", "gen/x.rb", "z.rb"]);

        first.materialize(&tmp.path().join("one")).unwrap();
        second.materialize(&tmp.path().join("two")).unwrap();
        for dest in first.destinations() {
            assert_eq!(
                std::fs::read(tmp.path().join("one").join(dest)).unwrap(),
                std::fs::read(tmp.path().join("two").join(dest)).unwrap()
            );
        }
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }
}
