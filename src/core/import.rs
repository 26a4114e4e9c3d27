//! Suite imports and co-versioning constraints.

use std::fmt;

use serde::Serialize;

/// How a candidate location is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// A version-controlled repository checked out at the pinned revision.
    Git,
    /// A prebuilt suite archive.
    Binary,
    /// A local directory, relative to the importing suite.
    Path,
}

impl LocationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "git" => Some(LocationKind::Git),
            "binary" => Some(LocationKind::Binary),
            "path" => Some(LocationKind::Path),
            _ => None,
        }
    }

    /// Whether fetching needs the network.
    pub fn is_remote(&self) -> bool {
        !matches!(self, LocationKind::Path)
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Git => write!(f, "git"),
            LocationKind::Binary => write!(f, "binary"),
            LocationKind::Path => write!(f, "path"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImportLocation {
    pub url: String,
    pub kind: LocationKind,
}

impl fmt::Display for ImportLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

/// A pinned reference to another suite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Import {
    pub name: String,
    /// Revision or tag; `None` only for path-only imports.
    pub version: Option<String>,
    /// The suite lives in a subdirectory named after it.
    pub subdir: bool,
    /// Candidate locations in order of preference.
    pub locations: Vec<ImportLocation>,
}

impl Import {
    /// Version label for messages and cache keys.
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("<unpinned>")
    }
}

/// Imports that must resolve to the same version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoVersionGroup {
    pub imports: Vec<String>,
    pub reason: Option<String>,
}
