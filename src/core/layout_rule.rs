//! Layout rules for distributions that assemble a file tree.
//!
//! A rule maps one destination to an ordered list of sources. Destinations
//! ending in `/` (or `./`) are directories; anything else names a single
//! file that its source is copied (and renamed) to.

use serde::Serialize;

use crate::core::placeholder;
use crate::core::reference::Reference;

/// Where a layout entry comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LayoutSource {
    /// A file or directory in the declaring suite, copied as-is.
    Literal { path: String },
    /// A pattern expanded against the declaring suite at compose time.
    Glob { pattern: String, exclude: Vec<String> },
    /// The output of another project or distribution, optionally a path
    /// inside it.
    ArtifactRef {
        reference: Reference,
        path: Option<String>,
    },
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

impl LayoutSource {
    /// Parse the string form: `file:PATH` or `dependency:REF[/PATH]`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (kind, rest) = spec.split_once(':').ok_or_else(|| {
            format!("layout source `{}` has no `file:` or `dependency:` prefix", spec)
        })?;

        match kind {
            "file" => Self::file(rest, Vec::new()),
            "dependency" => Self::dependency(rest, None),
            other => Err(format!("unknown layout source kind `{}` in `{}`", other, spec)),
        }
    }

    /// A `file` source; becomes a glob when it has metacharacters or excludes.
    pub fn file(path: &str, exclude: Vec<String>) -> Result<Self, String> {
        if path.is_empty() {
            return Err("layout source has an empty path".to_string());
        }
        check_relative(path)?;
        placeholder::validate_path(path).map_err(|e| e.to_string())?;
        for pattern in &exclude {
            check_relative(pattern)?;
            glob::Pattern::new(pattern)
                .map_err(|e| format!("invalid exclude pattern `{}`: {}", pattern, e))?;
        }

        if has_glob_meta(path) || !exclude.is_empty() {
            glob::Pattern::new(path).map_err(|e| format!("invalid glob `{}`: {}", path, e))?;
            Ok(LayoutSource::Glob {
                pattern: path.to_string(),
                exclude,
            })
        } else {
            Ok(LayoutSource::Literal {
                path: path.to_string(),
            })
        }
    }

    /// A `dependency` source: `REF` or `REF/sub/path`.
    pub fn dependency(spec: &str, path: Option<String>) -> Result<Self, String> {
        let (reference, inline_path) = match spec.split_once('/') {
            Some((r, p)) => (r, Some(p.to_string())),
            None => (spec, None),
        };
        let reference: Reference = reference.parse().map_err(|e| format!("{}", e))?;

        let path = match (inline_path, path) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "dependency source `{}` gives a path both inline and as `path`",
                    spec
                ))
            }
            (a, b) => a.or(b).filter(|p| !p.is_empty()),
        };
        if let Some(p) = &path {
            check_relative(p)?;
            placeholder::validate_path(p).map_err(|e| e.to_string())?;
        }

        Ok(LayoutSource::ArtifactRef { reference, path })
    }

    pub fn is_glob(&self) -> bool {
        matches!(self, LayoutSource::Glob { .. })
    }
}

fn check_relative(path: &str) -> Result<(), String> {
    if path.starts_with('/') || path.split('/').any(|c| c == "..") {
        return Err(format!(
            "layout path `{}` must be relative and stay inside the suite",
            path
        ));
    }
    Ok(())
}

/// One destination and its ordered sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutRule {
    /// Destination inside the output tree; may carry platform placeholders.
    pub destination: String,
    pub sources: Vec<LayoutSource>,
}

impl LayoutRule {
    pub fn new(destination: &str, sources: Vec<LayoutSource>) -> Result<Self, String> {
        if destination.is_empty() {
            return Err("layout destination is empty".to_string());
        }
        check_relative(destination)?;
        placeholder::validate_path(destination).map_err(|e| e.to_string())?;
        if sources.is_empty() {
            return Err(format!("layout destination `{}` has no sources", destination));
        }
        Ok(LayoutRule {
            destination: destination.to_string(),
            sources,
        })
    }

    /// Whether the destination is a directory rather than a file name.
    pub fn is_directory(&self) -> bool {
        self.destination == "." || self.destination.ends_with('/')
    }

    /// References to other artifacts named by this rule.
    pub fn artifact_refs(&self) -> impl Iterator<Item = &Reference> {
        self.sources.iter().filter_map(|s| match s {
            LayoutSource::ArtifactRef { reference, .. } => Some(reference),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_literal_and_glob() {
        assert_eq!(
            LayoutSource::parse("file:README.md").unwrap(),
            LayoutSource::Literal {
                path: "README.md".into()
            }
        );
        assert_eq!(
            LayoutSource::parse("file:lib/cext/*.rb").unwrap(),
            LayoutSource::Glob {
                pattern: "lib/cext/*.rb".into(),
                exclude: vec![]
            }
        );
    }

    #[test]
    fn test_file_with_exclude_is_glob() {
        let src = LayoutSource::file(
            "src/main/c/openssl/*.h",
            vec!["src/main/c/openssl/extconf.h".into()],
        )
        .unwrap();
        assert!(src.is_glob());
    }

    #[test]
    fn test_parse_dependency() {
        let src = LayoutSource::parse(
            "dependency:org.truffleruby.cext/src/main/c/cext/<lib:truffleruby>",
        )
        .unwrap();
        match src {
            LayoutSource::ArtifactRef { reference, path } => {
                assert_eq!(reference.name(), "org.truffleruby.cext");
                assert_eq!(path.as_deref(), Some("src/main/c/cext/<lib:truffleruby>"));
            }
            other => panic!("unexpected source {:?}", other),
        }

        let src = LayoutSource::parse("dependency:truffle:TRUFFLE_NFI_NATIVE").unwrap();
        assert!(matches!(
            src,
            LayoutSource::ArtifactRef { ref reference, path: None }
                if reference.suite() == Some("truffle")
        ));
    }

    #[test]
    fn test_parse_rejects_bad_sources() {
        assert!(LayoutSource::parse("README.md").is_err());
        assert!(LayoutSource::parse("extracted-dependency:X").is_err());
        assert!(LayoutSource::parse("file:../outside").is_err());
        assert!(LayoutSource::parse("file:/abs/path").is_err());
        assert!(LayoutSource::parse("file:lib/<path:X>").is_err());
    }

    #[test]
    fn test_rule_destination_kinds() {
        let src = vec![LayoutSource::parse("file:LICENCE.md").unwrap()];
        assert!(LayoutRule::new("./", src.clone()).unwrap().is_directory());
        assert!(LayoutRule::new("bin/", src.clone()).unwrap().is_directory());
        assert!(!LayoutRule::new("LICENSE_TRUFFLERUBY.txt", src.clone())
            .unwrap()
            .is_directory());
        assert!(LayoutRule::new("bin/", vec![]).is_err());
    }
}
