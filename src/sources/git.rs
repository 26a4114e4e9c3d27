//! Git checkouts of imported suites.

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, ResetType};

use crate::sources::cache::KeyedCache;
use crate::sources::source::{Checkout, CheckoutError, VcsClient};
use crate::util::fs::sanitize_dir_name;
use crate::util::hash::sha256_str;

/// `VcsClient` backed by libgit2.
///
/// Each `(url, revision)` gets its own working tree, so imports pinned to
/// different revisions of one repository never share a checkout. Imports of
/// several suites from the same repository and revision share one.
pub struct GitClient {
    cache_dir: PathBuf,
    offline: bool,
    checkouts: KeyedCache<(String, String), Checkout>,
}

impl GitClient {
    pub fn new(cache_dir: PathBuf, offline: bool) -> Self {
        GitClient {
            cache_dir,
            offline,
            checkouts: KeyedCache::new(),
        }
    }

    /// Working tree location for a repository at a revision.
    pub fn checkout_path(&self, url: &str, revision: &str) -> PathBuf {
        let key = sha256_str(&format!("{}\0{}", url, revision));
        self.cache_dir
            .join(format!("{}-{}", sanitize_dir_name(url), &key[..8]))
    }

    fn remote_error(url: &str, e: git2::Error) -> CheckoutError {
        CheckoutError::Remote {
            url: url.to_string(),
            message: e.message().to_string(),
        }
    }

    fn clone_repo(&self, url: &str, path: &Path) -> Result<Repository, CheckoutError> {
        tracing::info!("Cloning {}", url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckoutError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Repository::clone(url, path).map_err(|e| Self::remote_error(url, e))
    }

    fn update(repo: &Repository, url: &str) -> Result<(), CheckoutError> {
        tracing::info!("Updating {}", url);
        let mut remote = repo
            .find_remote("origin")
            .map_err(|e| Self::remote_error(url, e))?;
        remote
            .fetch(
                &[
                    "+refs/heads/*:refs/remotes/origin/*",
                    "+refs/tags/*:refs/tags/*",
                ],
                None,
                None,
            )
            .map_err(|e| Self::remote_error(url, e))
    }

    /// A full commit id, a tag, or a branch on origin.
    fn find_commit<'r>(repo: &'r Repository, revision: &str) -> Option<git2::Commit<'r>> {
        if let Ok(oid) = Oid::from_str(revision) {
            if let Ok(commit) = repo.find_commit(oid) {
                return Some(commit);
            }
        }
        for name in [
            format!("refs/tags/{}", revision),
            format!("refs/remotes/origin/{}", revision),
        ] {
            if let Ok(commit) = repo
                .find_reference(&name)
                .and_then(|r| r.peel_to_commit())
            {
                return Some(commit);
            }
        }
        None
    }

    fn fetch_revision(&self, url: &str, revision: &str) -> Result<Checkout, CheckoutError> {
        let path = self.checkout_path(url, revision);

        let repo = if path.join(".git").exists() {
            Repository::open(&path).map_err(|e| Self::remote_error(url, e))?
        } else if self.offline {
            return Err(CheckoutError::Offline(format!("{}@{}", url, revision)));
        } else {
            self.clone_repo(url, &path)?
        };

        let commit = match Self::find_commit(&repo, revision) {
            Some(commit) => commit,
            None if self.offline => {
                return Err(CheckoutError::Offline(format!("{}@{}", url, revision)))
            }
            None => {
                Self::update(&repo, url)?;
                Self::find_commit(&repo, revision).ok_or_else(|| {
                    CheckoutError::RevisionNotFound {
                        url: url.to_string(),
                        revision: revision.to_string(),
                    }
                })?
            }
        };

        repo.reset(commit.as_object(), ResetType::Hard, None)
            .map_err(|e| Self::remote_error(url, e))?;

        let precise = commit.id().to_string();
        tracing::debug!("{} checked out at {}", url, precise);
        Ok(Checkout {
            path,
            revision: precise,
        })
    }
}

impl VcsClient for GitClient {
    fn checkout(&self, repo_url: &str, revision: &str) -> Result<Checkout, CheckoutError> {
        self.checkouts
            .get_or_try_insert_with((repo_url.to_string(), revision.to_string()), || {
                self.fetch_revision(repo_url, revision)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, content: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("quay", "quay@example.org").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_checkout_pinned_revisions() {
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        let repo = Repository::init(&upstream).unwrap();
        let first = commit_file(&repo, "Suite.toml", "first");
        let second = commit_file(&repo, "Suite.toml", "second");
        let tag_target = repo.find_object(first, None).unwrap();
        let sig = git2::Signature::now("quay", "quay@example.org").unwrap();
        repo.tag("v1", &tag_target, &sig, "v1", false).unwrap();

        let url = url::Url::from_file_path(&upstream).unwrap().to_string();
        let client = GitClient::new(tmp.path().join("cache"), false);

        let old = client.checkout(&url, &first.to_string()).unwrap();
        assert_eq!(old.revision, first.to_string());
        assert_eq!(std::fs::read_to_string(old.path.join("Suite.toml")).unwrap(), "first");

        let new = client.checkout(&url, &second.to_string()).unwrap();
        assert_ne!(old.path, new.path);
        assert_eq!(std::fs::read_to_string(new.path.join("Suite.toml")).unwrap(), "second");

        let tagged = client.checkout(&url, "v1").unwrap();
        assert_eq!(tagged.revision, first.to_string());

        let missing = client.checkout(&url, "no-such-tag").unwrap_err();
        assert!(matches!(missing, CheckoutError::RevisionNotFound { .. }));
    }

    #[test]
    fn test_offline_without_checkout() {
        let tmp = TempDir::new().unwrap();
        let client = GitClient::new(tmp.path().to_path_buf(), true);
        let err = client
            .checkout("https://github.com/example/graal.git", "abc")
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Offline(_)));
    }
}
