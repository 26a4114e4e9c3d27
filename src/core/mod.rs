//! Core data model for quay.
//!
//! Suites and their declarations as parsed from `Suite.toml`, the interned
//! identities used to name them, and the merged global namespace.

pub mod digest;
pub mod distribution;
pub mod entity_id;
pub mod global;
pub mod import;
pub mod layout_rule;
pub mod library;
pub mod license;
pub mod manifest;
pub mod placeholder;
pub mod platform;
pub mod project;
pub mod reference;
pub mod suite;
pub mod workspace;

pub use digest::{Digest, DigestAlgorithm};
pub use distribution::Distribution;
pub use entity_id::EntityId;
pub use global::{GlobalManifest, ResolvedSuite};
pub use layout_rule::{LayoutRule, LayoutSource};
pub use library::Library;
pub use manifest::{find_manifest, ManifestError, MANIFEST_NAME};
pub use platform::Platform;
pub use project::{Project, ProjectKind};
pub use reference::Reference;
pub use suite::{Entity, EntityKind, Suite};
pub use workspace::Workspace;
