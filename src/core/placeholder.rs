//! Path placeholders resolved at build or compose time.
//!
//! # Placeholder Formats
//!
//! - `<lib:NAME>` - platform shared library file name (`libNAME.so`)
//! - `<extsuffix:NAME>` - platform extension file name (`NAME.so`, `NAME.bundle`)
//! - `<exe:NAME>` - platform executable file name (`NAME`, `NAME.exe`)
//! - `<path:REF>` - output location of another declaration (build env only)

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::platform::Platform;
use crate::core::reference::Reference;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z]+):([^<>]*)>").expect("placeholder pattern is valid"));

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Lib(String),
    ExtSuffix(String),
    Exe(String),
    Path(Reference),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("unknown placeholder kind `{kind}` in `{input}`")]
    UnknownKind { kind: String, input: String },

    #[error("placeholder `<{kind}:>` has an empty argument in `{input}`")]
    EmptyArgument { kind: String, input: String },

    #[error("unbalanced `<` or `>` in `{input}`")]
    Unbalanced { input: String },

    #[error("invalid reference in `<path:…>`: {0}")]
    BadReference(String),

    #[error("`<path:…>` placeholders are only allowed in build environments (in `{input}`)")]
    PathNotAllowed { input: String },

    #[error("placeholder `{placeholder}` needs a target platform")]
    NoPlatform { placeholder: String },

    #[error("cannot resolve `<path:{reference}>`")]
    Unresolved { reference: String },
}

/// Supplies values for placeholders that depend on build state.
pub trait Resolver {
    fn platform(&self) -> Option<Platform>;

    fn resolve_path(&self, reference: &Reference) -> Option<String>;
}

/// Resolver for plain path templates: platform only, no `<path:…>`.
pub struct PlatformResolver(pub Option<Platform>);

impl Resolver for PlatformResolver {
    fn platform(&self) -> Option<Platform> {
        self.0
    }

    fn resolve_path(&self, _reference: &Reference) -> Option<String> {
        None
    }
}

/// Parse a string into literal and placeholder segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(input) {
        let (Some(whole), Some(kind), Some(arg)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        push_literal(&mut segments, &input[last..whole.start()], input)?;
        last = whole.end();

        let kind = kind.as_str();
        let arg = arg.as_str();
        if arg.is_empty() {
            return Err(PlaceholderError::EmptyArgument {
                kind: kind.to_string(),
                input: input.to_string(),
            });
        }

        let placeholder = match kind {
            "lib" => Placeholder::Lib(arg.to_string()),
            "extsuffix" => Placeholder::ExtSuffix(arg.to_string()),
            "exe" => Placeholder::Exe(arg.to_string()),
            "path" => Placeholder::Path(
                arg.parse()
                    .map_err(|e: crate::core::reference::ReferenceError| {
                        PlaceholderError::BadReference(e.to_string())
                    })?,
            ),
            other => {
                return Err(PlaceholderError::UnknownKind {
                    kind: other.to_string(),
                    input: input.to_string(),
                })
            }
        };
        segments.push(Segment::Placeholder(placeholder));
    }

    push_literal(&mut segments, &input[last..], input)?;
    Ok(segments)
}

fn push_literal(
    segments: &mut Vec<Segment>,
    text: &str,
    input: &str,
) -> Result<(), PlaceholderError> {
    if text.contains(['<', '>']) {
        return Err(PlaceholderError::Unbalanced {
            input: input.to_string(),
        });
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

/// Validate a path that may only carry platform placeholders.
pub fn validate_path(input: &str) -> Result<(), PlaceholderError> {
    let segments = parse(input)?;
    if segments
        .iter()
        .any(|s| matches!(s, Segment::Placeholder(Placeholder::Path(_))))
    {
        return Err(PlaceholderError::PathNotAllowed {
            input: input.to_string(),
        });
    }
    Ok(())
}

/// References named by `<path:…>` placeholders.
pub fn path_references(input: &str) -> Result<Vec<Reference>, PlaceholderError> {
    Ok(parse(input)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Placeholder(Placeholder::Path(r)) => Some(r),
            _ => None,
        })
        .collect())
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
    let segments = parse(input)?;
    substitute_segments(&segments, resolver)
}

pub fn substitute_segments(
    segments: &[Segment],
    resolver: &impl Resolver,
) -> Result<String, PlaceholderError> {
    let mut out = String::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(Placeholder::Path(reference)) => {
                let value = resolver.resolve_path(reference).ok_or_else(|| {
                    PlaceholderError::Unresolved {
                        reference: reference.to_string(),
                    }
                })?;
                out.push_str(&value);
            }
            Segment::Placeholder(placeholder) => {
                let platform = resolver.platform().ok_or_else(|| PlaceholderError::NoPlatform {
                    placeholder: format!("{:?}", placeholder),
                })?;
                match placeholder {
                    Placeholder::Lib(name) => out.push_str(&platform.lib_file_name(name)),
                    Placeholder::ExtSuffix(name) => out.push_str(&platform.ext_file_name(name)),
                    Placeholder::Exe(name) => out.push_str(&platform.exe_file_name(name)),
                    Placeholder::Path(_) => {}
                }
            }
        }
    }

    Ok(out)
}

/// Expand platform placeholders in a path.
pub fn expand_for_platform(
    input: &str,
    platform: Option<Platform>,
) -> Result<String, PlaceholderError> {
    substitute(input, &PlatformResolver(platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};

    const LINUX: Platform = Platform {
        os: Os::Linux,
        arch: Arch::Amd64,
    };

    struct EnvResolver;

    impl Resolver for EnvResolver {
        fn platform(&self) -> Option<Platform> {
            Some(LINUX)
        }

        fn resolve_path(&self, reference: &Reference) -> Option<String> {
            (reference.name() == "TRUFFLE_NFI_NATIVE").then(|| "/out/truffle/nfi".to_string())
        }
    }

    #[test]
    fn test_parse_segments() {
        let segments = parse("src/main/c/cext/<lib:truffleruby>").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("src/main/c/cext/".to_string()),
                Segment::Placeholder(Placeholder::Lib("truffleruby".to_string())),
            ]
        );
    }

    #[test]
    fn test_expand_platform_placeholders() {
        assert_eq!(
            expand_for_platform("lib/mri/<extsuffix:openssl>", Some(LINUX)).unwrap(),
            "lib/mri/openssl.so"
        );
        assert_eq!(
            expand_for_platform("plain/path.rb", None).unwrap(),
            "plain/path.rb"
        );
        assert!(matches!(
            expand_for_platform("<lib:x>", None),
            Err(PlaceholderError::NoPlatform { .. })
        ));
    }

    #[test]
    fn test_path_placeholder_in_env() {
        let value = substitute("<path:truffle:TRUFFLE_NFI_NATIVE>/include", &EnvResolver).unwrap();
        assert_eq!(value, "/out/truffle/nfi/include");

        let err = substitute("<path:MISSING>/include", &EnvResolver).unwrap_err();
        assert!(matches!(err, PlaceholderError::Unresolved { .. }));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("<dll:x>"),
            Err(PlaceholderError::UnknownKind { .. })
        ));
        assert!(matches!(
            parse("<lib:>"),
            Err(PlaceholderError::EmptyArgument { .. })
        ));
        assert!(matches!(
            parse("lib/<lib:x"),
            Err(PlaceholderError::Unbalanced { .. })
        ));
        assert!(matches!(
            validate_path("<path:X>/include"),
            Err(PlaceholderError::PathNotAllowed { .. })
        ));
    }

    #[test]
    fn test_path_references() {
        let refs = path_references("<path:truffle:TRUFFLE_NFI_NATIVE>/include:<path:SULONG_HOME>")
            .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].suite(), Some("truffle"));
        assert_eq!(refs[1].name(), "SULONG_HOME");
    }
}
