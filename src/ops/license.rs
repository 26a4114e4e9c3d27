//! License validation across every loaded suite.

use std::collections::HashSet;

use thiserror::Error;

use crate::core::entity_id::EntityId;
use crate::core::global::GlobalManifest;
use crate::core::license::Repository;
use crate::core::suite::EntityKind;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Which repository's allowed licenses apply.
#[derive(Debug, Clone, Default)]
pub struct LicensePolicy {
    /// Check every suite against this repository instead of its own.
    pub repository: Option<String>,
}

/// A declaration whose license is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{kind} `{entity}` uses license `{license}`, which no loaded suite defines")]
    UnknownLicense {
        entity: EntityId,
        kind: EntityKind,
        license: String,
    },

    #[error("{kind} `{entity}` uses license `{license}`, which {repositories} does not allow")]
    NotAllowed {
        entity: EntityId,
        kind: EntityKind,
        license: String,
        repositories: String,
    },

    #[error("{kind} `{entity}` declares no license and its suite has no default")]
    MissingLicense { entity: EntityId, kind: EntityKind },

    #[error("license repository `{name}` is not declared by any loaded suite")]
    UnknownRepository { name: String },
}

impl Violation {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            Violation::UnknownLicense { license, .. } => diag
                .with_suggestion(format!("Add a `[[license]]` entry with id = \"{}\"", license)),
            Violation::UnknownRepository { .. } => {
                diag.with_suggestion("Check `[license] repository` in .quay/config.toml")
            }
            _ => diag.with_suggestion(suggestions::LICENSE),
        }
    }
}

/// Check the licenses of every library, project and distribution.
///
/// All violations are collected; an empty result means every declaration
/// passes.
pub fn validate(global: &GlobalManifest, policy: &LicensePolicy) -> Vec<Violation> {
    let mut violations = Vec::new();

    let known: HashSet<&str> = global
        .suites()
        .iter()
        .flat_map(|s| s.suite.licenses.iter().map(|l| l.id.as_str()))
        .collect();

    let named: Option<&Repository> = match &policy.repository {
        Some(name) => {
            let found = global
                .suites()
                .iter()
                .flat_map(|s| s.suite.repositories.iter())
                .find(|r| &r.name == name);
            if found.is_none() {
                violations.push(Violation::UnknownRepository { name: name.clone() });
                return violations;
            }
            found
        }
        None => None,
    };

    for resolved in global.suites() {
        let suite = &resolved.suite;
        let repositories: Vec<&Repository> = match named {
            Some(repo) => vec![repo],
            None => suite.repositories.iter().collect(),
        };
        if repositories.is_empty() {
            tracing::debug!("suite `{}` has no repository, skipping license check", suite.name);
            continue;
        }
        let repository_names = repositories
            .iter()
            .map(|r| format!("`{}`", r.name))
            .collect::<Vec<_>>()
            .join(", ");

        for entity in suite.entities() {
            let id = EntityId::new(suite.name.as_str(), entity.name());
            let kind = entity.kind();
            let licenses = suite.effective_licenses(entity);
            if licenses.is_empty() {
                violations.push(Violation::MissingLicense { entity: id, kind });
                continue;
            }
            for license in licenses {
                if !known.contains(license.as_str()) {
                    violations.push(Violation::UnknownLicense {
                        entity: id,
                        kind,
                        license: license.clone(),
                    });
                } else if !repositories.iter().any(|r| r.allows(license)) {
                    violations.push(Violation::NotAllowed {
                        entity: id,
                        kind,
                        license: license.clone(),
                        repositories: repository_names.clone(),
                    });
                }
            }
        }
    }

    violations
}
