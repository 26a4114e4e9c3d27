//! Archive distributions: a deterministic `.tar.gz` of constituent outputs.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::builder::external::{BuildError, BuildOutput, BuildRequest, ExternalBuilder};

/// Packs the files of every input artifact and library into one archive.
///
/// Directory artifacts contribute their files at their relative paths,
/// file artifacts and libraries at their file name. When two inputs provide
/// the same entry the later one wins. Entries are sorted and carry fixed
/// metadata, so equal inputs give byte-identical archives.
#[derive(Debug, Default)]
pub struct ArchiveBuilder;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ArchiveBuilder {
    fn entries(request: &BuildRequest) -> BTreeMap<PathBuf, PathBuf> {
        let mut entries = BTreeMap::new();
        for input in &request.inputs {
            if input.path.is_dir() {
                for file in &input.files {
                    entries.insert(file.clone(), input.path.join(file));
                }
            } else if let Some(name) = input.path.file_name() {
                entries.insert(PathBuf::from(name), input.path.clone());
            }
        }
        for library in &request.libraries {
            if let Some(name) = library.file_name() {
                entries.insert(PathBuf::from(name), library.clone());
            }
        }
        entries
    }

    fn write(dest: &Path, entries: &BTreeMap<PathBuf, PathBuf>) -> Result<(), BuildError> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        let tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err(parent))?;

        let gz = GzEncoder::new(tmp.reopen().map_err(io_err(dest))?, Compression::default());
        let mut tar = tar::Builder::new(gz);
        for (name, source) in entries {
            let data = std::fs::read(source).map_err(io_err(source))?;
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);
            header.set_cksum();
            tar.append_data(&mut header, name, data.as_slice())
                .map_err(io_err(source))?;
        }
        let gz = tar.into_inner().map_err(io_err(dest))?;
        let file: File = gz.finish().map_err(io_err(dest))?;
        file.sync_all().map_err(io_err(dest))?;
        drop(file);

        tmp.persist(dest).map_err(|e| BuildError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

impl ExternalBuilder for ArchiveBuilder {
    fn name(&self) -> &str {
        "archive"
    }

    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let file_name = request
            .options
            .results
            .first()
            .cloned()
            .unwrap_or_else(|| format!("{}.tar.gz", request.node.name().to_lowercase()));
        let dest = request.options.output_dir.join(file_name);

        let entries = Self::entries(request);
        tracing::debug!("archiving {} entries into {}", entries.len(), dest.display());
        Self::write(&dest, &entries)?;

        Ok(BuildOutput {
            path: dest,
            files: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::artifact::ArtifactHandle;
    use crate::builder::external::{BuildKind, BuildOptions};
    use crate::core::entity_id::EntityId;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn handle(name: &str, path: PathBuf, files: &[&str]) -> ArtifactHandle {
        ArtifactHandle {
            node: EntityId::new("demo", name),
            fingerprint: name.into(),
            path,
            files: files.iter().map(PathBuf::from).collect(),
            fresh: true,
            platform: None,
        }
    }

    fn archive_entries(path: &Path) -> Vec<(String, String)> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let name = e.path().unwrap().display().to_string();
                let mut content = String::new();
                e.read_to_string(&mut content).unwrap();
                (name, content)
            })
            .collect()
    }

    #[test]
    fn test_archive_is_sorted_and_deterministic() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        std::fs::create_dir_all(a.join("lib")).unwrap();
        std::fs::write(a.join("lib/z.rb"), "z").unwrap();
        std::fs::write(a.join("lib/b.rb"), "b").unwrap();
        let jar = tmp.path().join("joni.jar");
        std::fs::write(&jar, "jar").unwrap();

        let request = |out: &str| BuildRequest {
            node: EntityId::new("demo", "DIST"),
            kind: BuildKind::Archive,
            base_dir: tmp.path().to_path_buf(),
            source_dirs: vec![],
            inputs: vec![handle("A", a.clone(), &["lib/b.rb", "lib/z.rb"])],
            libraries: vec![jar.clone()],
            processors: vec![],
            options: BuildOptions {
                output_dir: tmp.path().join(out),
                results: vec!["dist.tar.gz".into()],
                ..Default::default()
            },
        };

        let first = ArchiveBuilder.build(&request("one")).unwrap();
        let second = ArchiveBuilder.build(&request("two")).unwrap();
        assert_eq!(first.path, tmp.path().join("one/dist.tar.gz"));
        assert_eq!(
            std::fs::read(&first.path).unwrap(),
            std::fs::read(&second.path).unwrap()
        );

        let entries = archive_entries(&first.path);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["joni.jar", "lib/b.rb", "lib/z.rb"]);
    }
}
