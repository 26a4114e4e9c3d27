//! The merged, frozen namespace of every loaded suite.
//!
//! A `GlobalManifest` is assembled once after import resolution and then
//! passed by reference to graph construction, validation and the executor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::distribution::Distribution;
use crate::core::entity_id::EntityId;
use crate::core::library::Library;
use crate::core::project::Project;
use crate::core::reference::Reference;
use crate::core::suite::{Entity, EntityKind, Suite};

/// A suite as loaded by the import resolver.
#[derive(Debug, Clone)]
pub struct ResolvedSuite {
    pub suite: Arc<Suite>,
    /// Precise revision the suite was checked out at, if it came from VCS.
    pub revision: Option<String>,
    /// Loaded from a binary archive: its outputs exist and are never built.
    pub prebuilt: bool,
}

impl ResolvedSuite {
    pub fn local(suite: Suite) -> Self {
        ResolvedSuite {
            suite: Arc::new(suite),
            revision: None,
            prebuilt: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.suite.name
    }
}

/// Why a reference failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No suite declares the name (or the qualifying suite is not loaded).
    Unknown,
    /// An unqualified name declared by several other suites.
    Ambiguous(Vec<EntityId>),
}

#[derive(Debug, Clone, Copy)]
struct Location {
    suite: usize,
    kind: EntityKind,
}

/// Every loaded suite, indexed by qualified entity identity.
#[derive(Debug)]
pub struct GlobalManifest {
    /// Load order: the root suite first, then imports breadth-first.
    suites: Vec<ResolvedSuite>,
    by_name: HashMap<String, usize>,
    index: HashMap<EntityId, Location>,
}

impl GlobalManifest {
    /// Index already de-duplicated suites. Suite names must be unique.
    pub(crate) fn from_suites(suites: Vec<ResolvedSuite>) -> Self {
        let mut by_name = HashMap::new();
        let mut index = HashMap::new();

        for (i, resolved) in suites.iter().enumerate() {
            by_name.insert(resolved.suite.name.clone(), i);
            for entity in resolved.suite.entities() {
                index.insert(
                    EntityId::new(resolved.suite.name.as_str(), entity.name()),
                    Location {
                        suite: i,
                        kind: entity.kind(),
                    },
                );
            }
        }

        GlobalManifest {
            suites,
            by_name,
            index,
        }
    }

    pub fn suites(&self) -> &[ResolvedSuite] {
        &self.suites
    }

    /// The suite the run started from.
    pub fn root(&self) -> &ResolvedSuite {
        &self.suites[0]
    }

    pub fn suite(&self, name: &str) -> Option<&ResolvedSuite> {
        self.by_name.get(name).map(|&i| &self.suites[i])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.index.get(&id).map(|l| l.kind)
    }

    /// The suite declaring an entity.
    pub fn suite_of(&self, id: EntityId) -> Option<&ResolvedSuite> {
        self.index.get(&id).map(|l| &self.suites[l.suite])
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity<'_>> {
        self.suite_of(id)?.suite.entity(id.name())
    }

    pub fn library(&self, id: EntityId) -> Option<&Library> {
        self.suite_of(id)?.suite.library(id.name())
    }

    pub fn project(&self, id: EntityId) -> Option<&Project> {
        self.suite_of(id)?.suite.project(id.name())
    }

    pub fn distribution(&self, id: EntityId) -> Option<&Distribution> {
        self.suite_of(id)?.suite.distribution(id.name())
    }

    /// Deterministic ordering key: (suite load index, declaration index).
    pub fn ordinal(&self, id: EntityId) -> Option<(usize, usize)> {
        let loc = self.index.get(&id)?;
        let decl = self.suites[loc.suite].suite.declaration_index(id.name())?;
        Some((loc.suite, decl))
    }

    /// All buildable declarations (projects, then distributions) in load order.
    pub fn buildable_ids(&self) -> Vec<EntityId> {
        let mut ids = Vec::new();
        for resolved in &self.suites {
            let suite = &resolved.suite;
            ids.extend(
                suite
                    .projects
                    .iter()
                    .map(|p| EntityId::new(suite.name.as_str(), p.name.as_str())),
            );
            ids.extend(
                suite
                    .distributions
                    .iter()
                    .map(|d| EntityId::new(suite.name.as_str(), d.name.as_str())),
            );
        }
        ids
    }

    /// Resolve a reference written in `from_suite`.
    ///
    /// Qualified references name their suite. Unqualified ones try the
    /// declaring suite first, then every other loaded suite; more than one
    /// match there is ambiguous.
    pub fn resolve(
        &self,
        from_suite: &str,
        reference: &Reference,
    ) -> Result<EntityId, LookupError> {
        if let Some(suite) = reference.suite() {
            let id = EntityId::new(suite, reference.name());
            return if self.contains(id) {
                Ok(id)
            } else {
                Err(LookupError::Unknown)
            };
        }

        let local = EntityId::new(from_suite, reference.name());
        if self.contains(local) {
            return Ok(local);
        }

        let mut candidates: Vec<EntityId> = self
            .suites
            .iter()
            .filter(|s| s.suite.name != from_suite)
            .map(|s| EntityId::new(s.suite.name.as_str(), reference.name()))
            .filter(|id| self.contains(*id))
            .collect();

        match candidates.len() {
            0 => Err(LookupError::Unknown),
            1 => Ok(candidates[0]),
            _ => {
                candidates.sort();
                Err(LookupError::Ambiguous(candidates))
            }
        }
    }
}
