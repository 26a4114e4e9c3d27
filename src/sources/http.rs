//! HTTP artifact downloads and archive unpacking.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use url::Url;

use crate::core::digest::{Digest, DigestAlgorithm};
use crate::sources::source::{ArtifactFetcher, FetchError};
use crate::util::fs::sanitize_dir_name;
use crate::util::hash::{sha256_file, sha256_str};

/// `ArtifactFetcher` over HTTP(S), with `file://` URLs read in place.
///
/// Downloads land in `<download_dir>/<url hash>/<file name>` and are reused
/// when they still match the expected digest.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    download_dir: PathBuf,
    offline: bool,
}

impl HttpFetcher {
    pub fn new(download_dir: PathBuf, offline: bool) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("quay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(HttpFetcher {
            client,
            download_dir,
            offline,
        })
    }

    fn destination(&self, url: &Url) -> PathBuf {
        let file_name = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .map(sanitize_dir_name)
            .unwrap_or_else(|| "download".to_string());
        self.download_dir
            .join(&sha256_str(url.as_str())[..16])
            .join(file_name)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        tracing::info!("Downloading {}", url);
        let network = |message: String| FetchError::Network {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(network(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().map_err(|e| network(e.to_string()))?;

        let parent = dest.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        let io_err = |source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(dest).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

/// Check a file against an expected digest.
pub fn verify_digest(url: &str, path: &Path, expected: &Digest) -> Result<(), FetchError> {
    if expected.algorithm != DigestAlgorithm::Sha256 {
        return Err(FetchError::UnsupportedDigest {
            url: url.to_string(),
            algorithm: expected.algorithm,
        });
    }
    let actual = sha256_file(path).map_err(|e| FetchError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(format!("{:#}", e)),
    })?;
    if expected.matches(DigestAlgorithm::Sha256, &actual) {
        Ok(())
    } else {
        Err(FetchError::DigestMismatch {
            url: url.to_string(),
            expected: expected.clone(),
            actual,
        })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, expected: Option<&Digest>) -> Result<PathBuf, FetchError> {
        if let Some(digest) = expected {
            if digest.algorithm != DigestAlgorithm::Sha256 {
                return Err(FetchError::UnsupportedDigest {
                    url: url.to_string(),
                    algorithm: digest.algorithm,
                });
            }
        }

        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
            if !path.exists() {
                return Err(FetchError::Io {
                    path,
                    source: std::io::ErrorKind::NotFound.into(),
                });
            }
            if let (Some(digest), true) = (expected, path.is_file()) {
                verify_digest(url, &path, digest)?;
            }
            return Ok(path);
        }

        let dest = self.destination(&parsed);
        if dest.is_file() {
            match expected {
                Some(digest) if verify_digest(url, &dest, digest).is_err() => {
                    tracing::warn!("cached {} is stale, downloading again", dest.display());
                }
                _ => {
                    tracing::debug!("using cached {}", dest.display());
                    return Ok(dest);
                }
            }
        }

        if self.offline {
            return Err(FetchError::Offline(url.to_string()));
        }

        self.download(url, &dest)?;
        if let Some(digest) = expected {
            if let Err(e) = verify_digest(url, &dest, digest) {
                let _ = std::fs::remove_file(&dest);
                return Err(e);
            }
        }
        Ok(dest)
    }
}

/// Unpack a `.tar.gz` archive into `dest`.
pub fn unpack_tar_gz(archive: &Path, dest: &Path) -> std::io::Result<()> {
    let file = File::open(archive)?;
    std::fs::create_dir_all(dest)?;
    tar::Archive::new(GzDecoder::new(file)).unpack(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::sha256_bytes;
    use tempfile::TempDir;

    fn file_url(path: &Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[test]
    fn test_file_url_with_digest() {
        let tmp = TempDir::new().unwrap();
        let jar = tmp.path().join("joni.jar");
        std::fs::write(&jar, b"jar bytes").unwrap();
        let fetcher = HttpFetcher::new(tmp.path().join("downloads"), true).unwrap();

        let good = Digest::new(DigestAlgorithm::Sha256, &sha256_bytes(b"jar bytes")).unwrap();
        assert_eq!(fetcher.fetch(&file_url(&jar), Some(&good)).unwrap(), jar);

        let bad = Digest::new(DigestAlgorithm::Sha256, &sha256_bytes(b"other")).unwrap();
        assert!(matches!(
            fetcher.fetch(&file_url(&jar), Some(&bad)),
            Err(FetchError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_sha1_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(tmp.path().to_path_buf(), false).unwrap();
        let sha1 = Digest::new(
            DigestAlgorithm::Sha1,
            "a23a567521996c2a412688763892cddbca7c3bd6",
        )
        .unwrap();
        assert!(matches!(
            fetcher.fetch("https://repo.example.org/joni.jar", Some(&sha1)),
            Err(FetchError::UnsupportedDigest { .. })
        ));
    }

    #[test]
    fn test_offline_refuses_network() {
        let tmp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(tmp.path().to_path_buf(), true).unwrap();
        assert!(matches!(
            fetcher.fetch("https://repo.example.org/joni.jar", None),
            Err(FetchError::Offline(_))
        ));
        assert!(matches!(
            fetcher.fetch("not a url", None),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_unpack_tar_gz() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("suite.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(gz);
            let data = b"[suite]\nname = \"tools\"\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "Suite.toml", &data[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = tmp.path().join("out");
        unpack_tar_gz(&archive, &dest).unwrap();
        assert!(dest.join("Suite.toml").is_file());
    }
}
