//! Suite fixtures written to temporary directories.

use std::path::{Path, PathBuf};

use crate::core::manifest::MANIFEST_NAME;
use crate::core::suite::Suite;
use crate::util::hash::sha256_str;

/// Builder for a `Suite.toml` plus the files next to it.
#[derive(Debug, Clone)]
pub struct SuiteFixture {
    name: String,
    sections: Vec<String>,
    files: Vec<(PathBuf, String)>,
}

fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("\"{}\"", i)).collect();
    format!("[{}]", quoted.join(", "))
}

impl SuiteFixture {
    pub fn new(name: impl Into<String>) -> Self {
        SuiteFixture {
            name: name.into(),
            sections: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Append raw TOML. A section starting with `[suite]` replaces the
    /// generated header.
    pub fn raw(mut self, toml: &str) -> Self {
        self.sections.push(toml.to_string());
        self
    }

    /// A URL library with a valid sha256 digest.
    pub fn library(self, name: &str) -> Self {
        let section = format!(
            "[[library]]\nname = \"{name}\"\nurl = \"https://repo.example.org/{name}.jar\"\n\
             sha256 = \"{}\"\n",
            sha256_str(name)
        );
        self.raw(&section)
    }

    /// A managed project with the given dependencies.
    pub fn project(self, name: &str, deps: &[&str]) -> Self {
        let section = format!(
            "[[project]]\nname = \"{name}\"\ndependencies = {}\n",
            quoted_list(deps)
        );
        self.raw(&section)
    }

    /// A data project whose directory is its artifact.
    pub fn data_project(self, name: &str, deps: &[&str]) -> Self {
        let section = format!(
            "[[project]]\nname = \"{name}\"\nkind = \"data\"\ndependencies = {}\n",
            quoted_list(deps)
        );
        self.raw(&section)
    }

    /// An archive distribution of the given constituents.
    pub fn distribution(self, name: &str, deps: &[&str]) -> Self {
        let section = format!(
            "[[distribution]]\nname = \"{name}\"\ndependencies = {}\n",
            quoted_list(deps)
        );
        self.raw(&section)
    }

    /// Import a sibling suite by relative path.
    pub fn import_path(self, name: &str, path: &str) -> Self {
        let section = format!(
            "[[import]]\nname = \"{name}\"\nurls = [{{ url = \"{path}\", kind = \"path\" }}]\n"
        );
        self.raw(&section)
    }

    /// A file written next to the manifest.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    pub fn manifest_text(&self) -> String {
        let mut out = String::new();
        if !self.sections.iter().any(|s| s.trim_start().starts_with("[suite]")) {
            out.push_str(&format!("[suite]\nname = \"{}\"\n", self.name));
        }
        for section in &self.sections {
            out.push('\n');
            out.push_str(section);
        }
        out
    }

    /// Write the suite into `dir` and return the manifest path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        for (path, content) in &self.files {
            let full = dir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let manifest = dir.join(MANIFEST_NAME);
        std::fs::write(&manifest, self.manifest_text()).unwrap();
        manifest
    }

    /// Write and load the suite.
    pub fn load(&self, dir: &Path) -> Suite {
        let manifest = self.write(dir);
        match Suite::load(&manifest) {
            Ok(suite) => suite,
            Err(e) => panic!(
                "fixture `{}` failed to load: {}\n{}",
                self.name,
                e,
                self.manifest_text()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_round_trips_through_loader() {
        let tmp = tempfile::TempDir::new().unwrap();
        let suite = SuiteFixture::new("demo")
            .library("L")
            .data_project("D", &[])
            .project("P", &["D", "L"])
            .distribution("X", &["P"])
            .file("D/readme.txt", "hi")
            .load(tmp.path());

        assert_eq!(suite.name, "demo");
        assert_eq!(suite.projects.len(), 2);
        assert!(tmp.path().join("D/readme.txt").is_file());
        assert_eq!(suite.root, tmp.path());
    }
}
