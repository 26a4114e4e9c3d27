//! License definitions and hosting repositories.

use serde::Serialize;

/// A license a suite knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

/// A repository that hosts a suite's artifacts, and the licenses it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
    pub licenses: Vec<String>,
}

impl Repository {
    pub fn allows(&self, license: &str) -> bool {
        self.licenses.iter().any(|l| l == license)
    }
}
