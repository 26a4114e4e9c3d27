//! Prebuilt external libraries.

use serde::Serialize;

use crate::core::digest::Digest;

/// Maven Central repository URL.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

/// A Maven coordinate identifying a single artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// File extension, `jar` unless declared otherwise.
    pub packaging: String,
}

impl MavenCoordinate {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        MavenCoordinate {
            group_id: group_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
            version: version.to_owned(),
            packaging: "jar".to_owned(),
        }
    }

    pub fn with_packaging(mut self, packaging: &str) -> Self {
        self.packaging = packaging.to_owned();
        self
    }

    /// `{artifact_id}-{version}.{packaging}`
    pub fn filename(&self) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, self.packaging)
    }

    /// The companion source archive file name.
    pub fn sources_filename(&self) -> String {
        format!("{}-{}-sources.jar", self.artifact_id, self.version)
    }

    /// Repository-relative directory: group dots become slashes.
    pub fn repository_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    /// Full download URL against a repository base.
    pub fn url(&self, repository: &str) -> String {
        format!(
            "{}/{}/{}",
            repository.trim_end_matches('/'),
            self.repository_dir(),
            self.filename()
        )
    }

    pub fn sources_url(&self, repository: &str) -> String {
        format!(
            "{}/{}/{}",
            repository.trim_end_matches('/'),
            self.repository_dir(),
            self.sources_filename()
        )
    }
}

/// Where a library is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryLocation {
    Maven(MavenCoordinate),
    Url(String),
}

/// A library declared by a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Library {
    pub name: String,
    pub location: LibraryLocation,
    pub digest: Digest,
    pub source_digest: Option<Digest>,
    pub licenses: Vec<String>,
}

impl Library {
    /// Download URL of the binary artifact.
    pub fn url(&self, maven_repository: &str) -> String {
        match &self.location {
            LibraryLocation::Maven(coord) => coord.url(maven_repository),
            LibraryLocation::Url(url) => url.clone(),
        }
    }

    /// Download URL of the companion source archive, when it has one.
    pub fn sources_url(&self, maven_repository: &str) -> Option<String> {
        self.source_digest.as_ref()?;
        match &self.location {
            LibraryLocation::Maven(coord) => Some(coord.sources_url(maven_repository)),
            LibraryLocation::Url(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::DigestAlgorithm;

    #[test]
    fn test_maven_url() {
        let coord = MavenCoordinate::new("org.jruby.joni", "joni", "2.1.30");
        assert_eq!(
            coord.url(MAVEN_CENTRAL),
            "https://repo1.maven.org/maven2/org/jruby/joni/joni/2.1.30/joni-2.1.30.jar"
        );
        assert_eq!(
            coord.url("https://mirror.example.org/maven/"),
            "https://mirror.example.org/maven/org/jruby/joni/joni/2.1.30/joni-2.1.30.jar"
        );
    }

    #[test]
    fn test_sources_url_requires_source_digest() {
        let mut lib = Library {
            name: "JONI".into(),
            location: LibraryLocation::Maven(MavenCoordinate::new(
                "org.jruby.joni",
                "joni",
                "2.1.30",
            )),
            digest: Digest::new(
                DigestAlgorithm::Sha1,
                "a23a567521996c2a412688763892cddbca7c3bd6",
            )
            .unwrap(),
            source_digest: None,
            licenses: vec!["MIT".into()],
        };
        assert!(lib.sources_url(MAVEN_CENTRAL).is_none());

        lib.source_digest = Some(
            Digest::new(
                DigestAlgorithm::Sha1,
                "a1444342fc0c275613d43ca3d0a71ce919d85b18",
            )
            .unwrap(),
        );
        assert!(lib
            .sources_url(MAVEN_CENTRAL)
            .unwrap()
            .ends_with("joni-2.1.30-sources.jar"));
    }
}
