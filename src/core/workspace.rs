//! Workspace: the root suite plus its configuration and output paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::platform::Platform;
use crate::core::suite::Suite;
use crate::util::config::{self, Config};
use crate::util::GlobalContext;

/// The suite a command runs in.
#[derive(Debug)]
pub struct Workspace {
    root_suite: Arc<Suite>,

    config: Config,

    /// Target directory for build outputs
    target_dir: PathBuf,
}

impl Workspace {
    /// Load the root suite and merge global and project configuration.
    pub fn new(manifest_path: &Path, ctx: &GlobalContext) -> Result<Self> {
        let suite = Suite::load(manifest_path)?;
        let config = config::load_config(
            ctx.config_path().as_deref(),
            &config::project_config_path(&suite.root),
        );
        Ok(Self::from_parts(suite, config))
    }

    /// Build a workspace from an already-loaded suite.
    pub fn from_parts(suite: Suite, config: Config) -> Self {
        let target_dir = match &config.build.target_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => suite.root.join(dir),
            None => suite.root.join(".quay").join("target"),
        };

        Workspace {
            root_suite: Arc::new(suite),
            config,
            target_dir,
        }
    }

    pub fn root_suite(&self) -> &Arc<Suite> {
        &self.root_suite
    }

    /// The root suite's directory.
    pub fn root(&self) -> &Path {
        &self.root_suite.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Output directory of one declaration. Platform-specific nodes get a
    /// directory per platform, everything else lives under `common`.
    pub fn node_output_dir(&self, platform: Option<Platform>, suite: &str, name: &str) -> PathBuf {
        let bucket = platform.map_or_else(|| "common".to_string(), |p| p.to_string());
        self.target_dir.join(bucket).join(suite).join(name)
    }

    /// The on-disk fingerprint cache.
    pub fn fingerprint_path(&self) -> PathBuf {
        self.target_dir.join("fingerprints.json")
    }

    /// The JSON build plan written by `quay graph --plan`.
    pub fn plan_path(&self) -> PathBuf {
        self.target_dir.join("plan.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};
    use crate::test_support::SuiteFixture;

    #[test]
    fn test_workspace_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("demo").project("P", &[]).load(tmp.path());
        let ws = Workspace::from_parts(suite, Config::default());

        assert_eq!(ws.target_dir(), tmp.path().join(".quay/target"));
        assert_eq!(
            ws.node_output_dir(None, "demo", "P"),
            tmp.path().join(".quay/target/common/demo/P")
        );
        assert_eq!(
            ws.node_output_dir(Some(Platform::new(Os::Linux, Arch::Amd64)), "demo", "P"),
            tmp.path().join(".quay/target/linux-amd64/demo/P")
        );
    }

    #[test]
    fn test_configured_target_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("demo").load(tmp.path());
        let mut config = Config::default();
        config.build.target_dir = Some(PathBuf::from("out"));

        let ws = Workspace::from_parts(suite, config);
        assert_eq!(ws.target_dir(), tmp.path().join("out"));
        assert_eq!(ws.fingerprint_path(), tmp.path().join("out/fingerprints.json"));
    }
}
