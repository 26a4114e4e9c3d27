//! Implementation of `quay clean`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::workspace::Workspace;

/// Remove build outputs. Returns the removed directory, if there was one.
pub fn clean(workspace: &Workspace) -> Result<Option<PathBuf>> {
    let target = workspace.target_dir();
    if !target.exists() {
        return Ok(None);
    }
    std::fs::remove_dir_all(target)
        .with_context(|| format!("failed to remove {}", target.display()))?;
    tracing::debug!("removed {}", target.display());
    Ok(Some(target.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SuiteFixture;
    use crate::util::config::Config;

    #[test]
    fn test_clean_removes_target_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("app").load(tmp.path());
        let workspace = Workspace::from_parts(suite, Config::default());
        std::fs::create_dir_all(workspace.target_dir().join("common")).unwrap();
        std::fs::write(workspace.fingerprint_path(), "{}").unwrap();

        assert_eq!(clean(&workspace).unwrap().as_deref(), Some(workspace.target_dir()));
        assert!(!workspace.target_dir().exists());
        assert_eq!(clean(&workspace).unwrap(), None);
    }
}
