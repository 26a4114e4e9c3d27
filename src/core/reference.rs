//! Name references between declarations.
//!
//! A reference names a library, project or distribution, optionally
//! qualified with the suite that declares it: `JONI` or `truffle:TRUFFLE_API`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An unresolved reference to a declared entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    suite: Option<String>,
    name: String,
}

/// Why a reference string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reference `{input}`: {reason}")]
pub struct ReferenceError {
    pub input: String,
    pub reason: &'static str,
}

impl Reference {
    /// An unqualified reference.
    pub fn local(name: impl Into<String>) -> Self {
        Reference {
            suite: None,
            name: name.into(),
        }
    }

    /// A suite-qualified reference.
    pub fn qualified(suite: impl Into<String>, name: impl Into<String>) -> Self {
        Reference {
            suite: Some(suite.into()),
            name: name.into(),
        }
    }

    /// The qualifying suite, if any.
    pub fn suite(&self) -> Option<&str> {
        self.suite.as_deref()
    }

    /// The referenced entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_qualified(&self) -> bool {
        self.suite.is_some()
    }
}

fn valid_component(s: &str) -> bool {
    !s.is_empty()
        && !s.contains(char::is_whitespace)
        && !s.contains(['/', '<', '>'])
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ReferenceError {
            input: s.to_string(),
            reason,
        };

        match s.split_once(':') {
            Some((suite, name)) => {
                if name.contains(':') {
                    return Err(err("expected at most one `:` separator"));
                }
                if !valid_component(suite) {
                    return Err(err("suite qualifier is empty or malformed"));
                }
                if !valid_component(name) {
                    return Err(err("entity name is empty or malformed"));
                }
                Ok(Reference::qualified(suite, name))
            }
            None => {
                if !valid_component(s) {
                    return Err(err("entity name is empty or malformed"));
                }
                Ok(Reference::local(s))
            }
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.suite {
            Some(suite) => write!(f, "{}:{}", suite, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local() {
        let r: Reference = "JONI".parse().unwrap();
        assert_eq!(r.name(), "JONI");
        assert!(!r.is_qualified());
    }

    #[test]
    fn test_parse_qualified() {
        let r: Reference = "truffle:TRUFFLE_NFI_NATIVE".parse().unwrap();
        assert_eq!(r.suite(), Some("truffle"));
        assert_eq!(r.name(), "TRUFFLE_NFI_NATIVE");
        assert_eq!(r.to_string(), "truffle:TRUFFLE_NFI_NATIVE");
    }

    #[test]
    fn test_parse_malformed() {
        assert!("".parse::<Reference>().is_err());
        assert!(":X".parse::<Reference>().is_err());
        assert!("a:".parse::<Reference>().is_err());
        assert!("a:b:c".parse::<Reference>().is_err());
        assert!("has space".parse::<Reference>().is_err());
    }
}
