//! Integrity digests declared for external artifacts.
//!
//! Digests are carried through to the fetcher untouched; nothing in the
//! core hashes downloaded content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hash algorithm of a declared digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the hex encoding.
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared digest: algorithm plus lowercase hex value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    pub algorithm: DigestAlgorithm,
    pub value: String,
}

impl Digest {
    /// Validate and normalize a hex digest.
    pub fn new(algorithm: DigestAlgorithm, value: &str) -> Result<Self, String> {
        let value = value.trim().to_ascii_lowercase();
        if value.len() != algorithm.hex_len() {
            return Err(format!(
                "{} digest must be {} hex characters, got {}",
                algorithm,
                algorithm.hex_len(),
                value.len()
            ));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("{} digest contains non-hex characters", algorithm));
        }
        Ok(Digest { algorithm, value })
    }

    /// Compare against a digest computed by a fetcher.
    pub fn matches(&self, algorithm: DigestAlgorithm, hex_value: &str) -> bool {
        self.algorithm == algorithm && self.value.eq_ignore_ascii_case(hex_value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}
