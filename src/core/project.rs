//! Buildable projects.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::reference::Reference;

/// How a project is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Managed-language sources compiled by an external compiler.
    Managed,
    /// Native sources built by an external toolchain.
    Native,
    /// Plain data; the source tree is the output.
    Data,
}

impl FromStr for ProjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managed" => Ok(ProjectKind::Managed),
            "native" => Ok(ProjectKind::Native),
            "data" => Ok(ProjectKind::Data),
            other => Err(format!(
                "unknown project kind `{}` (expected managed, native or data)",
                other
            )),
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKind::Managed => write!(f, "managed"),
            ProjectKind::Native => write!(f, "native"),
            ProjectKind::Data => write!(f, "data"),
        }
    }
}

/// A language level range: `8+`, `11` or `8..11` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageVersion {
    pub min: u32,
    pub max: Option<u32>,
}

impl LanguageVersion {
    /// Whether some language level satisfies both ranges.
    pub fn intersects(&self, other: &LanguageVersion) -> bool {
        let lo = self.min.max(other.min);
        match (self.max, other.max) {
            (Some(a), Some(b)) => lo <= a.min(b),
            (Some(a), None) | (None, Some(a)) => lo <= a,
            (None, None) => true,
        }
    }

    /// Whether a concrete language level is in range.
    pub fn contains(&self, level: u32) -> bool {
        level >= self.min && self.max.is_none_or(|max| level <= max)
    }
}

impl FromStr for LanguageVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid language version `{}`", s))
        };

        if let Some(min) = s.strip_suffix('+') {
            return Ok(LanguageVersion {
                min: parse(min)?,
                max: None,
            });
        }
        if let Some((lo, hi)) = s.split_once("..") {
            let (min, max) = (parse(lo)?, parse(hi)?);
            if min > max {
                return Err(format!("empty language version range `{}`", s));
            }
            return Ok(LanguageVersion {
                min,
                max: Some(max),
            });
        }
        let exact = parse(s)?;
        Ok(LanguageVersion {
            min: exact,
            max: Some(exact),
        })
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            None => write!(f, "{}+", self.min),
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{}..{}", self.min, max),
        }
    }
}

impl Serialize for LanguageVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A project declared by a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub kind: ProjectKind,
    /// Project directory relative to the suite root.
    pub dir: PathBuf,
    /// Source directories relative to `dir`.
    pub source_dirs: Vec<String>,
    pub dependencies: Vec<Reference>,
    /// Needed to build, not part of the project's own inputs.
    pub build_dependencies: Vec<Reference>,
    pub annotation_processors: Vec<Reference>,
    /// Declared outputs relative to the output directory; may carry
    /// platform placeholders.
    pub results: Vec<String>,
    /// Output directory relative to the suite root, if fixed.
    pub output: Option<PathBuf>,
    /// Environment for the builder; values may carry `<path:…>`.
    pub build_env: BTreeMap<String, String>,
    pub language_version: Option<LanguageVersion>,
    pub licenses: Vec<String>,
    pub test: bool,
}
