//! Configuration file support for quay.
//!
//! quay reads two configuration files:
//! - Global: `~/.quay/config.toml` - user-wide defaults
//! - Project: `<suite>/.quay/config.toml` - overrides for one suite
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::library::MAVEN_CENTRAL;

/// quay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,

    pub net: NetConfig,

    pub license: LicenseConfig,

    /// External builder commands, keyed by build kind (`managed`, `native`)
    pub builders: BTreeMap<String, BuilderCommand>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Number of parallel jobs (None = number of CPUs)
    pub jobs: Option<usize>,

    /// Output directory, relative to the root suite
    pub target_dir: Option<PathBuf>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NetConfig {
    /// Skip git and binary import candidates and remote libraries
    pub offline: bool,

    /// Repository that Maven library coordinates resolve against
    pub maven_repository: Option<String>,
}

/// License validation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Check every suite against this one repository instead of its own
    pub repository: Option<String>,
}

/// A configured external builder program.
///
/// Arguments and environment values may reference request fields as
/// `{name}`, `{source_dir}`, `{output_dir}`, `{platform}`, `{classpath}`,
/// `{processors}` and `{language_version}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.target_dir.is_some() {
            self.build.target_dir = other.build.target_dir;
        }

        if other.net.offline {
            self.net.offline = true;
        }
        if other.net.maven_repository.is_some() {
            self.net.maven_repository = other.net.maven_repository;
        }

        if other.license.repository.is_some() {
            self.license.repository = other.license.repository;
        }

        // Builder entries replace whole, never field by field.
        self.builders.extend(other.builders);
    }

    pub fn maven_repository(&self) -> &str {
        self.net.maven_repository.as_deref().unwrap_or(MAVEN_CENTRAL)
    }

    pub fn jobs(&self) -> usize {
        self.build
            .jobs
            .filter(|&j| j > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`<suite>/.quay/config.toml`)
/// 2. Global config (`~/.quay/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// The global quay directory (`~/.quay`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// The global config file (`~/.quay/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// The project config file of a suite.
pub fn project_config_path(suite_root: &Path) -> PathBuf {
    suite_root.join(".quay").join("config.toml")
}
