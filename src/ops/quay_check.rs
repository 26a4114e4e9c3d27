//! Implementation of `quay check`: structural and license validation
//! without building anything.

use anyhow::Result;

use crate::ops::license::{self, LicensePolicy, Violation};
use crate::ops::load::Session;

/// What `quay check` found.
#[derive(Debug)]
pub struct CheckReport {
    pub suites: usize,
    pub nodes: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn success(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validate a loaded session.
///
/// Loading already rejects unresolvable imports, collisions, skew and bad
/// references; this adds the cycle check and license validation.
pub fn check(session: &Session, license_repository: Option<String>) -> Result<CheckReport> {
    let order = session.graph.topo_sort()?;
    tracing::debug!("graph is acyclic, {} nodes", order.len());

    let policy = LicensePolicy {
        repository: license_repository
            .or_else(|| session.workspace.config().license.repository.clone()),
    };
    let violations = license::validate(&session.global, &policy);

    Ok(CheckReport {
        suites: session.global.suites().len(),
        nodes: order.len(),
        violations,
    })
}
