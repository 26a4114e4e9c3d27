//! Suite.toml manifest parsing and schema.
//!
//! The manifest is deserialized into raw serde structs first and then
//! converted into the typed model, so every validation error can name the
//! suite and declaration it came from.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use semver::{Version, VersionReq};
use serde::Deserialize;
use thiserror::Error;

use crate::core::digest::{Digest, DigestAlgorithm};
use crate::core::distribution::Distribution;
use crate::core::import::{CoVersionGroup, Import, ImportLocation, LocationKind};
use crate::core::layout_rule::{LayoutRule, LayoutSource};
use crate::core::library::{Library, LibraryLocation, MavenCoordinate};
use crate::core::license::{License, Repository};
use crate::core::placeholder;
use crate::core::project::{LanguageVersion, Project, ProjectKind};
use crate::core::reference::Reference;
use crate::core::suite::Suite;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// File name of a suite manifest.
pub const MANIFEST_NAME: &str = "Suite.toml";

/// Error loading or validating a manifest.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ManifestError {
    #[error("no Suite.toml found in {} or any parent directory", dir.display())]
    #[diagnostic(code(quay::manifest::not_found), help("Run quay from inside a suite"))]
    NotFound { dir: PathBuf },

    #[error("failed to read {}", path.display())]
    #[diagnostic(code(quay::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    #[diagnostic(code(quay::manifest::syntax))]
    Syntax {
        path: PathBuf,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label]
        span: Option<SourceSpan>,
    },

    #[error("suite `{suite}`: {kind} `{entity}`: {message}")]
    #[diagnostic(code(quay::manifest::invalid))]
    Invalid {
        suite: String,
        kind: &'static str,
        entity: String,
        message: String,
    },

    #[error("suite `{suite}` declares `{name}` twice (as {first} and as {second})")]
    #[diagnostic(code(quay::manifest::duplicate))]
    Duplicate {
        suite: String,
        name: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("suite `{suite}` requires quay {required}, this is quay {running}")]
    #[diagnostic(code(quay::manifest::tool_version))]
    IncompatibleTool {
        suite: String,
        required: VersionReq,
        running: Version,
    },
}

impl ManifestError {
    fn invalid(suite: &str, kind: &'static str, entity: &str, message: impl Into<String>) -> Self {
        ManifestError::Invalid {
            suite: suite.to_string(),
            kind,
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ManifestError::NotFound { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::NO_MANIFEST)
            }
            ManifestError::Syntax { path, message, .. } => {
                Diagnostic::error(format!("invalid TOML: {}", message)).with_location(path)
            }
            ManifestError::Duplicate { .. } => Diagnostic::error(self.to_string()).with_suggestion(
                "Names must be unique across libraries, projects and distributions",
            ),
            ManifestError::IncompatibleTool { required, .. } => Diagnostic::error(self.to_string())
                .with_suggestion(format!("Install a quay release matching `{}`", required)),
            _ => Diagnostic::error(self.to_string()),
        }
    }
}

// `Many` goes first: a derived struct also accepts a sequence.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    suite: RawSuite,

    #[serde(default, rename = "import")]
    imports: Vec<RawImport>,

    #[serde(default, rename = "co-version")]
    co_versions: Vec<RawCoVersion>,

    #[serde(default, rename = "license")]
    licenses: Vec<RawLicense>,

    #[serde(default, rename = "repository")]
    repositories: Vec<RawRepository>,

    #[serde(default, rename = "library")]
    libraries: Vec<RawLibrary>,

    #[serde(default, rename = "project")]
    projects: Vec<RawProject>,

    #[serde(default, rename = "distribution")]
    distributions: Vec<RawDistribution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSuite {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    quay_version: Option<String>,
    #[serde(default)]
    default_license: OneOrMany<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawImport {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    subdir: bool,
    #[serde(default)]
    urls: Vec<RawImportUrl>,
    /// Shorthand for a single `kind = "path"` location.
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawImportUrl {
    url: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoVersion {
    imports: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLicense {
    id: String,
    name: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    name: String,
    url: String,
    #[serde(default)]
    licenses: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawLibrary {
    name: String,
    #[serde(default)]
    maven: Option<RawMaven>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    sha1: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    source_sha1: Option<String>,
    #[serde(default)]
    source_sha256: Option<String>,
    #[serde(default)]
    license: OneOrMany<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMaven {
    group: String,
    artifact: String,
    version: String,
    #[serde(default)]
    packaging: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawProject {
    name: String,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    source_dirs: Vec<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    native: bool,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    build_dependencies: Vec<String>,
    #[serde(default)]
    annotation_processors: Vec<String>,
    #[serde(default)]
    language_version: Option<String>,
    #[serde(default)]
    results: Vec<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    build_env: BTreeMap<String, String>,
    #[serde(default)]
    license: OneOrMany<String>,
    #[serde(default)]
    test: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDistribution {
    name: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    dist_dependencies: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    layout: Vec<RawLayoutRule>,
    #[serde(default)]
    native: bool,
    #[serde(default)]
    platform_dependent: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    main_class: Option<String>,
    #[serde(default)]
    license: OneOrMany<String>,
    #[serde(default)]
    test: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayoutRule {
    dest: String,
    #[serde(alias = "source")]
    sources: OneOrMany<RawLayoutSource>,
}

/// Raw layout source: `"file:…"` / `"dependency:…"` or a table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLayoutSource {
    Spec(String),
    Table(RawLayoutTable),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayoutTable {
    source: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// Load a suite manifest from a file path.
pub fn load(path: &Path) -> Result<Suite, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&content, path)
}

/// Parse manifest content. `path` locates the suite root and names the
/// source in diagnostics.
pub fn parse(content: &str, path: &Path) -> Result<Suite, ManifestError> {
    let raw: RawManifest = toml::from_str(content).map_err(|e| ManifestError::Syntax {
        path: path.to_path_buf(),
        message: e.message().to_string(),
        src: NamedSource::new(path.display().to_string(), content.to_string()),
        span: e.span().map(SourceSpan::from),
    })?;

    let suite_name = raw.suite.name.clone();
    check_name(&suite_name)
        .map_err(|m| ManifestError::invalid(&suite_name, "suite", &suite_name, m))?;

    let quay_version = match &raw.suite.quay_version {
        Some(req) => {
            let req = VersionReq::parse(req).map_err(|e| {
                let message = format!("invalid quay-version: {}", e);
                ManifestError::invalid(&suite_name, "suite", &suite_name, message)
            })?;
            let running = running_version();
            if !req.matches(&running) {
                return Err(ManifestError::IncompatibleTool {
                    suite: suite_name,
                    required: req,
                    running,
                });
            }
            Some(req)
        }
        None => None,
    };

    let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    let imports = raw
        .imports
        .into_iter()
        .map(|i| convert_import(&suite_name, i))
        .collect::<Result<Vec<_>, _>>()?;
    let mut seen_imports = HashMap::new();
    for import in &imports {
        if seen_imports.insert(import.name.as_str(), ()).is_some() {
            return Err(ManifestError::invalid(
                &suite_name,
                "import",
                &import.name,
                "imported more than once",
            ));
        }
    }

    let co_versions = raw
        .co_versions
        .into_iter()
        .map(|g| convert_co_version(&suite_name, &imports, g))
        .collect::<Result<Vec<_>, _>>()?;

    let licenses = raw
        .licenses
        .into_iter()
        .map(|l| License {
            id: l.id,
            name: l.name,
            url: l.url,
        })
        .collect();

    let repositories = raw
        .repositories
        .into_iter()
        .map(|r| Repository {
            name: r.name,
            url: r.url,
            licenses: r.licenses,
        })
        .collect();

    let libraries = raw
        .libraries
        .into_iter()
        .map(|l| convert_library(&suite_name, l))
        .collect::<Result<Vec<_>, _>>()?;

    let projects = raw
        .projects
        .into_iter()
        .map(|p| convert_project(&suite_name, p))
        .collect::<Result<Vec<_>, _>>()?;

    let distributions = raw
        .distributions
        .into_iter()
        .map(|d| convert_distribution(&suite_name, d))
        .collect::<Result<Vec<_>, _>>()?;

    let suite = Suite {
        name: suite_name,
        version: raw.suite.version,
        root,
        quay_version,
        default_license: raw.suite.default_license.into_vec(),
        imports,
        co_versions,
        licenses,
        repositories,
        libraries,
        projects,
        distributions,
    };

    check_duplicates(&suite)?;
    Ok(suite)
}

/// Find the manifest in `start` or the nearest parent directory.
pub fn find_manifest(start: &Path) -> Result<PathBuf, ManifestError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ManifestError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}

fn running_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.contains(|c: char| c.is_whitespace() || matches!(c, ':' | '/' | '<' | '>')) {
        return Err(format!("name `{}` contains whitespace or one of `:/<>`", name));
    }
    Ok(())
}

fn check_duplicates(suite: &Suite) -> Result<(), ManifestError> {
    let mut seen: HashMap<&str, &'static str> = HashMap::new();
    for entity in suite.entities() {
        if let Some(first) = seen.insert(entity.name(), entity.kind().as_str()) {
            return Err(ManifestError::Duplicate {
                suite: suite.name.clone(),
                name: entity.name().to_string(),
                first,
                second: entity.kind().as_str(),
            });
        }
    }
    Ok(())
}

fn convert_refs(
    suite: &str,
    kind: &'static str,
    entity: &str,
    field: &str,
    raw: Vec<String>,
) -> Result<Vec<Reference>, ManifestError> {
    raw.iter()
        .map(|r| {
            r.parse::<Reference>().map_err(|e| {
                ManifestError::invalid(suite, kind, entity, format!("{}: {}", field, e))
            })
        })
        .collect()
}

fn convert_import(suite: &str, raw: RawImport) -> Result<Import, ManifestError> {
    let invalid = |m: String| ManifestError::invalid(suite, "import", &raw.name, m);
    check_name(&raw.name).map_err(invalid)?;

    let mut locations = Vec::new();
    for url in &raw.urls {
        let kind = LocationKind::parse(&url.kind).ok_or_else(|| {
            invalid(format!(
                "unknown location kind `{}` (expected git, binary or path)",
                url.kind
            ))
        })?;
        if kind == LocationKind::Binary {
            url::Url::parse(&url.url)
                .map_err(|e| invalid(format!("invalid url `{}`: {}", url.url, e)))?;
        }
        locations.push(ImportLocation {
            url: url.url.clone(),
            kind,
        });
    }
    if let Some(path) = &raw.path {
        locations.push(ImportLocation {
            url: path.clone(),
            kind: LocationKind::Path,
        });
    }

    if locations.is_empty() {
        return Err(invalid("no candidate locations (`urls` or `path`)".to_string()));
    }
    if raw.version.is_none() && locations.iter().any(|l| l.kind.is_remote()) {
        return Err(invalid("remote locations need a pinned `version`".to_string()));
    }

    Ok(Import {
        name: raw.name,
        version: raw.version,
        subdir: raw.subdir,
        locations,
    })
}

fn convert_co_version(
    suite: &str,
    imports: &[Import],
    raw: RawCoVersion,
) -> Result<CoVersionGroup, ManifestError> {
    let label = raw.imports.join(", ");
    if raw.imports.len() < 2 {
        return Err(ManifestError::invalid(
            suite,
            "co-version group",
            &label,
            "needs at least two imports",
        ));
    }
    for name in &raw.imports {
        match imports.iter().find(|i| &i.name == name) {
            None => {
                return Err(ManifestError::invalid(
                    suite,
                    "co-version group",
                    &label,
                    format!("`{}` is not an import of this suite", name),
                ))
            }
            Some(import) if import.version.is_none() => {
                return Err(ManifestError::invalid(
                    suite,
                    "co-version group",
                    &label,
                    format!("import `{}` has no pinned version", name),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(CoVersionGroup {
        imports: raw.imports,
        reason: raw.reason,
    })
}

fn digest_from(
    sha1: Option<String>,
    sha256: Option<String>,
) -> Result<Option<Digest>, String> {
    match (sha1, sha256) {
        (Some(_), Some(_)) => Err("declare either a sha1 or a sha256 digest, not both".to_string()),
        (Some(v), None) => Digest::new(DigestAlgorithm::Sha1, &v).map(Some),
        (None, Some(v)) => Digest::new(DigestAlgorithm::Sha256, &v).map(Some),
        (None, None) => Ok(None),
    }
}

fn convert_library(suite: &str, raw: RawLibrary) -> Result<Library, ManifestError> {
    let invalid = |m: String| ManifestError::invalid(suite, "library", &raw.name, m);
    check_name(&raw.name).map_err(invalid)?;

    let location = match (&raw.maven, &raw.url) {
        (Some(m), None) => {
            let mut coord = MavenCoordinate::new(&m.group, &m.artifact, &m.version);
            if let Some(packaging) = &m.packaging {
                coord = coord.with_packaging(packaging);
            }
            LibraryLocation::Maven(coord)
        }
        (None, Some(u)) => {
            url::Url::parse(u).map_err(|e| invalid(format!("invalid url `{}`: {}", u, e)))?;
            LibraryLocation::Url(u.clone())
        }
        (Some(_), Some(_)) => {
            return Err(invalid("declare either `maven` or `url`, not both".to_string()))
        }
        (None, None) => return Err(invalid("missing `maven` coordinate or `url`".to_string())),
    };

    let digest = digest_from(raw.sha1, raw.sha256)
        .map_err(invalid)?
        .ok_or_else(|| invalid("missing integrity digest (`sha1` or `sha256`)".to_string()))?;
    let source_digest = digest_from(raw.source_sha1, raw.source_sha256).map_err(invalid)?;

    Ok(Library {
        name: raw.name,
        location,
        digest,
        source_digest,
        licenses: raw.license.into_vec(),
    })
}

fn convert_project(suite: &str, raw: RawProject) -> Result<Project, ManifestError> {
    let name = raw.name;
    let invalid = |m: String| ManifestError::invalid(suite, "project", &name, m);
    check_name(&name).map_err(invalid)?;

    let kind = match (&raw.kind, raw.native) {
        (Some(k), native) => {
            let kind: ProjectKind = k.parse().map_err(invalid)?;
            if native && kind != ProjectKind::Native {
                return Err(invalid(format!("`native = true` conflicts with kind `{}`", kind)));
            }
            kind
        }
        (None, true) => ProjectKind::Native,
        (None, false) => ProjectKind::Managed,
    };

    for result in &raw.results {
        placeholder::validate_path(result).map_err(|e| invalid(format!("results: {}", e)))?;
    }
    for (key, value) in &raw.build_env {
        placeholder::parse(value).map_err(|e| invalid(format!("build-env `{}`: {}", key, e)))?;
    }

    let language_version = raw
        .language_version
        .as_deref()
        .map(str::parse::<LanguageVersion>)
        .transpose()
        .map_err(invalid)?;

    let dir = raw.dir.unwrap_or_else(|| name.clone());
    let output = raw.output.map(PathBuf::from);
    for path in std::iter::once(Path::new(&dir)).chain(output.as_deref()) {
        if path.is_absolute() || path.components().any(|c| c == std::path::Component::ParentDir) {
            return Err(invalid(format!(
                "`{}` must be relative and stay inside the suite",
                path.display()
            )));
        }
    }

    Ok(Project {
        dependencies: convert_refs(suite, "project", &name, "dependencies", raw.dependencies)?,
        build_dependencies: convert_refs(
            suite,
            "project",
            &name,
            "build-dependencies",
            raw.build_dependencies,
        )?,
        annotation_processors: convert_refs(
            suite,
            "project",
            &name,
            "annotation-processors",
            raw.annotation_processors,
        )?,
        kind,
        dir: PathBuf::from(dir),
        source_dirs: raw.source_dirs,
        results: raw.results,
        output,
        build_env: raw.build_env,
        language_version,
        licenses: raw.license.into_vec(),
        test: raw.test,
        name,
    })
}

fn convert_layout_source(raw: RawLayoutSource) -> Result<LayoutSource, String> {
    match raw {
        RawLayoutSource::Spec(s) => LayoutSource::parse(&s),
        RawLayoutSource::Table(t) => match t.source.as_str() {
            "file" => {
                let path = t.path.ok_or("file source table needs a `path`")?;
                LayoutSource::file(&path, t.exclude)
            }
            "dependency" => {
                if !t.exclude.is_empty() {
                    return Err("`exclude` only applies to file sources".to_string());
                }
                let name = t.name.ok_or("dependency source table needs a `name`")?;
                LayoutSource::dependency(&name, t.path)
            }
            other => Err(format!(
                "unknown layout source kind `{}` (expected file or dependency)",
                other
            )),
        },
    }
}

fn convert_distribution(suite: &str, raw: RawDistribution) -> Result<Distribution, ManifestError> {
    let name = raw.name;
    let invalid = |m: String| ManifestError::invalid(suite, "distribution", &name, m);
    check_name(&name).map_err(invalid)?;

    let mut layout = Vec::new();
    for rule in raw.layout {
        let sources = rule
            .sources
            .into_vec()
            .into_iter()
            .map(convert_layout_source)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|m| invalid(format!("layout `{}`: {}", rule.dest, m)))?;
        layout.push(LayoutRule::new(&rule.dest, sources).map_err(invalid)?);
    }

    Ok(Distribution {
        dependencies: convert_refs(suite, "distribution", &name, "dependencies", raw.dependencies)?,
        dist_dependencies: convert_refs(
            suite,
            "distribution",
            &name,
            "dist-dependencies",
            raw.dist_dependencies,
        )?,
        exclude: convert_refs(suite, "distribution", &name, "exclude", raw.exclude)?,
        layout,
        native: raw.native,
        platform_dependent: raw.platform_dependent,
        description: raw.description,
        main_class: raw.main_class,
        licenses: raw.license.into_vec(),
        test: raw.test,
        name,
    })
}
