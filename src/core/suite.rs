//! Suites: named, versioned collections of declarations.
//!
//! A Suite is built once by the manifest loader and never mutated after.

use std::path::{Path, PathBuf};

use semver::VersionReq;
use serde::Serialize;

use crate::core::distribution::Distribution;
use crate::core::import::{CoVersionGroup, Import};
use crate::core::library::Library;
use crate::core::license::{License, Repository};
use crate::core::manifest::{self, ManifestError};
use crate::core::project::Project;

/// The three kinds of named declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Library,
    Project,
    Distribution,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Library => "library",
            EntityKind::Project => "project",
            EntityKind::Distribution => "distribution",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed declaration of any kind.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Library(&'a Library),
    Project(&'a Project),
    Distribution(&'a Distribution),
}

impl<'a> Entity<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Library(_) => EntityKind::Library,
            Entity::Project(_) => EntityKind::Project,
            Entity::Distribution(_) => EntityKind::Distribution,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Entity::Library(l) => &l.name,
            Entity::Project(p) => &p.name,
            Entity::Distribution(d) => &d.name,
        }
    }

    /// Declared licenses, empty when the suite default applies.
    pub fn licenses(&self) -> &'a [String] {
        match self {
            Entity::Library(l) => &l.licenses,
            Entity::Project(p) => &p.licenses,
            Entity::Distribution(d) => &d.licenses,
        }
    }
}

/// A loaded suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    pub version: Option<String>,
    /// Directory holding the suite's manifest.
    pub root: PathBuf,
    pub quay_version: Option<VersionReq>,
    pub default_license: Vec<String>,
    pub imports: Vec<Import>,
    pub co_versions: Vec<CoVersionGroup>,
    pub licenses: Vec<License>,
    pub repositories: Vec<Repository>,
    pub libraries: Vec<Library>,
    pub projects: Vec<Project>,
    pub distributions: Vec<Distribution>,
}

impl Suite {
    /// Load a suite from its `Suite.toml`.
    pub fn load(manifest_path: &Path) -> Result<Self, ManifestError> {
        manifest::load(manifest_path)
    }

    /// Load the suite whose manifest lives in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ManifestError> {
        manifest::load(&dir.join(manifest::MANIFEST_NAME))
    }

    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.iter().find(|l| l.name == name)
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn distribution(&self, name: &str) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.name == name)
    }

    /// Look up any declaration by name.
    pub fn entity(&self, name: &str) -> Option<Entity<'_>> {
        self.library(name)
            .map(Entity::Library)
            .or_else(|| self.project(name).map(Entity::Project))
            .or_else(|| self.distribution(name).map(Entity::Distribution))
    }

    /// All declarations: libraries, then projects, then distributions.
    pub fn entities(&self) -> impl Iterator<Item = Entity<'_>> {
        self.libraries
            .iter()
            .map(Entity::Library)
            .chain(self.projects.iter().map(Entity::Project))
            .chain(self.distributions.iter().map(Entity::Distribution))
    }

    /// Position of a buildable declaration: projects first, then
    /// distributions, each in manifest order.
    pub fn declaration_index(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.projects.iter().position(|p| p.name == name) {
            return Some(i);
        }
        self.distributions
            .iter()
            .position(|d| d.name == name)
            .map(|i| self.projects.len() + i)
    }

    /// Licenses that apply to a declaration, falling back to the suite default.
    pub fn effective_licenses<'a>(&'a self, entity: Entity<'a>) -> &'a [String] {
        let declared = entity.licenses();
        if declared.is_empty() {
            &self.default_license
        } else {
            declared
        }
    }

    pub fn import(&self, name: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.name == name)
    }

    pub fn license(&self, id: &str) -> Option<&License> {
        self.licenses.iter().find(|l| l.id == id)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(manifest::MANIFEST_NAME)
    }

    /// Whether two loads describe the same declarations, wherever they live.
    pub fn same_content(&self, other: &Suite) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.imports == other.imports
            && self.libraries == other.libraries
            && self.projects == other.projects
            && self.distributions == other.distributions
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::SuiteFixture;

    #[test]
    fn test_lookup_and_declaration_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("demo")
            .library("L")
            .project("P1", &[])
            .project("P2", &["P1", "L"])
            .distribution("X", &["P1", "P2"])
            .load(tmp.path());

        assert_eq!(suite.declaration_index("P1"), Some(0));
        assert_eq!(suite.declaration_index("P2"), Some(1));
        assert_eq!(suite.declaration_index("X"), Some(2));
        assert_eq!(suite.declaration_index("L"), None);

        assert_eq!(suite.entity("L").unwrap().kind(), super::EntityKind::Library);
        assert_eq!(suite.entities().count(), 4);
    }

    #[test]
    fn test_effective_licenses_fall_back_to_default() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("demo")
            .raw("[suite]\nname = \"demo\"\ndefault-license = \"EPL-2.0\"\n")
            .raw("[[project]]\nname = \"P\"\n")
            .raw("[[project]]\nname = \"Q\"\nlicense = [\"MIT\"]\n")
            .load(tmp.path());

        let p = suite.entity("P").unwrap();
        let q = suite.entity("Q").unwrap();
        assert_eq!(suite.effective_licenses(p), ["EPL-2.0".to_string()]);
        assert_eq!(suite.effective_licenses(q), ["MIT".to_string()]);
    }
}
