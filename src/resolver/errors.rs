//! Structural errors found while resolving imports and building the graph.
//!
//! All of these abort a run before anything is built.

use std::fmt;

use thiserror::Error;

use crate::core::entity_id::EntityId;
use crate::core::suite::EntityKind;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// One failed candidate location of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub location: String,
    pub cause: String,
}

/// A version some suite pinned an import to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPin {
    pub import: String,
    pub version: String,
    pub declared_by: String,
}

impl fmt::Display for VersionPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` at {} (pinned by `{}`)",
            self.import, self.version, self.declared_by
        )
    }
}

/// Error during import resolution or graph construction.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("suite `{suite}` at {version} is unavailable from every candidate location")]
    ImportUnavailable {
        suite: String,
        version: String,
        attempts: Vec<Attempt>,
    },

    #[error("suite `{suite}` was loaded twice with different declarations")]
    NameCollision {
        suite: String,
        entity: Option<String>,
        locations: Vec<String>,
    },

    #[error("version skew: {}", pins.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", "))]
    VersionSkew {
        pins: Vec<VersionPin>,
        reason: Option<String>,
    },

    #[error("unknown dependency `{reference}` in {field} of `{from}`")]
    UnknownDependency {
        from: EntityId,
        field: &'static str,
        reference: String,
    },

    #[error("dependency `{reference}` of `{from}` is ambiguous")]
    AmbiguousDependency {
        from: EntityId,
        reference: String,
        candidates: Vec<EntityId>,
    },

    #[error("{field} of `{from}` must name a {expected}, but `{target}` is a {found}")]
    KindMismatch {
        from: EntityId,
        field: &'static str,
        target: EntityId,
        expected: &'static str,
        found: EntityKind,
    },

    #[error("`{project}` needs {project_range}, but `{dependency}` needs {dependency_range}")]
    ConstraintConflict {
        project: EntityId,
        project_range: String,
        dependency: EntityId,
        dependency_range: String,
    },

    #[error("cyclic dependency: {}", format_cycle(cycle))]
    CyclicDependency { cycle: Vec<EntityId> },
}

fn format_cycle(cycle: &[EntityId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ImportUnavailable {
                suite,
                version,
                attempts,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not import suite `{}` at {}", suite, version));
                for attempt in attempts {
                    diag = diag.with_context(format!("{}: {}", attempt.location, attempt.cause));
                }
                diag.with_suggestion(suggestions::FETCH_FAILED)
                    .with_suggestion(format!(
                        "Check that `{}` is the suite name declared at each location",
                        suite
                    ))
            }

            ResolveError::NameCollision {
                suite,
                entity,
                locations,
            } => {
                let mut diag = Diagnostic::error(self.to_string());
                if let Some(entity) = entity {
                    diag = diag
                        .with_context(format!("`{}:{}` differs between the copies", suite, entity));
                }
                for location in locations {
                    diag = diag.with_context(format!("loaded from {}", location));
                }
                diag.with_suggestion(format!(
                    "Pin every import of `{}` to the same revision",
                    suite
                ))
            }

            ResolveError::VersionSkew { pins, reason } => {
                let mut diag = Diagnostic::error("imports that must share a version do not");
                for pin in pins {
                    diag = diag.with_context(pin.to_string());
                }
                if let Some(reason) = reason {
                    diag = diag.with_context(format!("reason: {}", reason));
                }
                diag.with_suggestion(suggestions::CO_VERSION)
            }

            ResolveError::UnknownDependency { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Check the spelling, or qualify it as `suite:NAME`")
                .with_suggestion(suggestions::UNKNOWN_REFERENCE),

            ResolveError::AmbiguousDependency { candidates, .. } => {
                let mut diag = Diagnostic::error(self.to_string());
                for candidate in candidates {
                    diag = diag.with_context(format!("candidate: {}", candidate));
                }
                diag.with_suggestion(suggestions::AMBIGUOUS_REFERENCE)
            }

            ResolveError::KindMismatch { .. } => Diagnostic::error(self.to_string()),

            ResolveError::ConstraintConflict { dependency, .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(format!(
                    "Adjust the language-version of either project or `{}`",
                    dependency
                ))
            }

            ResolveError::CyclicDependency { cycle } => {
                Diagnostic::error("cycle detected in dependency graph")
                    .with_context(format!("cycle: {}", format_cycle(cycle)))
                    .with_suggestion(suggestions::CYCLE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_unavailable_lists_attempts() {
        let err = ResolveError::ImportUnavailable {
            suite: "tools".into(),
            version: "0637445".into(),
            attempts: vec![
                Attempt {
                    location: "https://github.com/example/graal.git (git)".into(),
                    cause: "network unreachable".into(),
                },
                Attempt {
                    location: "https://repo.example.org/snapshots (binary)".into(),
                    cause: "HTTP 404".into(),
                },
            ],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("could not import suite `tools`"));
        assert!(output.contains("(git): network unreachable"));
        assert!(output.contains("(binary): HTTP 404"));
    }

    #[test]
    fn test_cycle_closes_the_loop() {
        let err = ResolveError::CyclicDependency {
            cycle: vec![EntityId::new("s", "A"), EntityId::new("s", "B")],
        };
        assert_eq!(err.to_string(), "cyclic dependency: s:A -> s:B -> s:A");
        assert!(err.to_diagnostic().format(false).contains("cycle: s:A -> s:B -> s:A"));
    }

    #[test]
    fn test_version_skew_names_every_pin() {
        let err = ResolveError::VersionSkew {
            pins: vec![
                VersionPin {
                    import: "tools".into(),
                    version: "aaa".into(),
                    declared_by: "truffleruby".into(),
                },
                VersionPin {
                    import: "sulong".into(),
                    version: "bbb".into(),
                    declared_by: "truffleruby".into(),
                },
            ],
            reason: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("`tools` at aaa"));
        assert!(msg.contains("`sulong` at bbb"));
    }
}
