//! Merging loaded suites into one global namespace.

use crate::core::global::{GlobalManifest, ResolvedSuite};
use crate::core::suite::Suite;
use crate::resolver::errors::ResolveError;

/// Merge suites in load order. A suite loaded twice collapses to its first
/// copy when both copies declare the same content; otherwise the merge
/// fails with `NameCollision`.
pub fn merge_namespace(loaded: Vec<ResolvedSuite>) -> Result<GlobalManifest, ResolveError> {
    let mut merged: Vec<ResolvedSuite> = Vec::with_capacity(loaded.len());

    for resolved in loaded {
        match merged.iter().find(|m| m.name() == resolved.name()) {
            None => merged.push(resolved),
            Some(first) if first.suite.same_content(&resolved.suite) => {
                tracing::debug!(
                    "suite `{}` loaded from {} and {}; using the first",
                    resolved.name(),
                    first.suite.root.display(),
                    resolved.suite.root.display()
                );
            }
            Some(first) => {
                return Err(ResolveError::NameCollision {
                    suite: resolved.name().to_string(),
                    entity: first_difference(&first.suite, &resolved.suite),
                    locations: vec![
                        first.suite.manifest_path().display().to_string(),
                        resolved.suite.manifest_path().display().to_string(),
                    ],
                })
            }
        }
    }

    Ok(GlobalManifest::from_suites(merged))
}

/// Name of the first declaration that differs between two copies of a suite.
fn first_difference(a: &Suite, b: &Suite) -> Option<String> {
    let names = a
        .entities()
        .map(|e| e.name().to_string())
        .chain(b.entities().map(|e| e.name().to_string()));

    for name in names {
        let same = match (a.library(&name), b.library(&name)) {
            (Some(x), Some(y)) => x == y,
            (None, None) => match (a.project(&name), b.project(&name)) {
                (Some(x), Some(y)) => x == y,
                (None, None) => a.distribution(&name) == b.distribution(&name),
                _ => false,
            },
            _ => false,
        };
        if !same {
            return Some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity_id::EntityId;
    use crate::test_support::SuiteFixture;
    use tempfile::TempDir;

    #[test]
    fn test_identical_copies_collapse() {
        let tmp = TempDir::new().unwrap();
        let fixture = SuiteFixture::new("tools").project("T", &[]);
        let a = fixture.load(&tmp.path().join("a"));
        let b = fixture.load(&tmp.path().join("b"));
        let root = SuiteFixture::new("root").load(&tmp.path().join("root"));

        let global = merge_namespace(vec![
            ResolvedSuite::local(root),
            ResolvedSuite::local(a),
            ResolvedSuite::local(b),
        ])
        .unwrap();

        assert_eq!(global.suites().len(), 2);
        let t = EntityId::new("tools", "T");
        assert_eq!(global.suite_of(t).unwrap().suite.root, tmp.path().join("a"));
    }

    #[test]
    fn test_different_copies_collide() {
        let tmp = TempDir::new().unwrap();
        let a = SuiteFixture::new("tools")
            .project("T", &[])
            .load(&tmp.path().join("a"));
        let b = SuiteFixture::new("tools")
            .project("T", &["U"])
            .project("U", &[])
            .load(&tmp.path().join("b"));

        match merge_namespace(vec![ResolvedSuite::local(a), ResolvedSuite::local(b)]).unwrap_err() {
            ResolveError::NameCollision {
                suite,
                entity,
                locations,
            } => {
                assert_eq!(suite, "tools");
                assert_eq!(entity.as_deref(), Some("T"));
                assert_eq!(locations.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
