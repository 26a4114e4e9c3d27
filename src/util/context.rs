//! Global context for quay operations.
//!
//! Provides centralized access to paths and output settings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::{self, ManifestError};
use crate::util::config;

/// Environment variable overriding the quay home directory.
pub const QUAY_HOME_ENV: &str = "QUAY_HOME";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "quay", "quay"));

/// Global context containing paths and output settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global quay data (caches)
    home: PathBuf,

    verbose: bool,

    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(home) = std::env::var_os(QUAY_HOME_ENV) {
            PathBuf::from(home)
        } else if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            config::global_config_dir().unwrap_or_else(|| PathBuf::from(".quay"))
        };

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Replace the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The quay home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Cache for everything fetched from the network.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Git checkouts of imported suites.
    pub fn git_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("git")
    }

    /// Downloaded libraries and suite archives.
    pub fn download_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("downloads")
    }

    /// Unpacked binary suites.
    pub fn suites_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("suites")
    }

    /// The global configuration file, when a home directory exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        config::global_config_path()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Find `Suite.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        manifest::find_manifest(&self.cwd)
    }
}
