//! Implementation of `quay build`.

use anyhow::{bail, Context, Result};

use crate::builder::events::BuildObserver;
use crate::builder::executor::{BuildReport, CancellationToken, Executor};
use crate::builder::external::BuilderRegistry;
use crate::builder::fingerprint::FingerprintCache;
use crate::builder::plan::BuildPlan;
use crate::core::entity_id::EntityId;
use crate::core::global::{GlobalManifest, LookupError};
use crate::core::platform::Platform;
use crate::core::reference::Reference;
use crate::core::suite::EntityKind;
use crate::ops::license::{self, LicensePolicy, Violation};
use crate::ops::load::Session;
use crate::resolver::graph::DependencyGraph;
use crate::sources::LibraryResolver;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Declarations to build (empty = everything).
    pub targets: Vec<String>,

    /// Target platforms (empty = the host).
    pub platforms: Vec<Platform>,

    /// Number of parallel jobs (None = config or CPU count).
    pub jobs: Option<usize>,

    /// Leave out test projects and distributions nothing else needs.
    pub no_tests: bool,

    /// Rebuild everything, ignoring fingerprints.
    pub clean: bool,

    /// Repository whose allowed licenses apply to every suite.
    pub license_repository: Option<String>,
}

/// What a build run produced.
#[derive(Debug)]
pub struct BuildResult {
    /// License violations, found independently of the build.
    pub violations: Vec<Violation>,
    pub report: BuildReport,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.violations.is_empty() && self.report.success()
    }
}

/// Resolve command-line targets against the root suite.
pub fn resolve_targets(global: &GlobalManifest, targets: &[String]) -> Result<Vec<EntityId>> {
    let root = global.root().name();
    let mut ids = Vec::with_capacity(targets.len());
    for target in targets {
        let reference: Reference = target.parse()?;
        let id = match global.resolve(root, &reference) {
            Ok(id) => id,
            Err(LookupError::Unknown) => bail!(
                "unknown target `{}`\nhint: use `quay graph` to list all declarations",
                target
            ),
            Err(LookupError::Ambiguous(candidates)) => bail!(
                "target `{}` is ambiguous, candidates: {}",
                target,
                candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        if global.kind(id) == Some(EntityKind::Library) {
            bail!("`{}` is a library; only projects and distributions can be built", id);
        }
        ids.push(id);
    }
    Ok(ids)
}

/// The part of the graph a build covers.
pub fn select_graph(
    session: &Session,
    targets: &[String],
    no_tests: bool,
) -> Result<DependencyGraph> {
    let graph = if targets.is_empty() {
        session.graph.clone()
    } else {
        let ids = resolve_targets(&session.global, targets)?;
        session.graph.closure(&ids)
    };
    Ok(if no_tests { graph.without_tests() } else { graph })
}

/// Host platform unless others were asked for.
pub fn target_platforms(requested: &[Platform]) -> Result<Vec<Platform>> {
    if !requested.is_empty() {
        let mut platforms = requested.to_vec();
        platforms.dedup();
        return Ok(platforms);
    }
    match Platform::current() {
        Some(p) => Ok(vec![p]),
        None => bail!("the host platform is not supported; pass --platform"),
    }
}

/// Plan and execute a build.
pub fn build(
    session: &Session,
    opts: &BuildOptions,
    registry: &BuilderRegistry,
    cancel: CancellationToken,
    observer: Option<&dyn BuildObserver>,
) -> Result<BuildResult> {
    let workspace = &session.workspace;
    let config = workspace.config();

    let policy = LicensePolicy {
        repository: opts
            .license_repository
            .clone()
            .or_else(|| config.license.repository.clone()),
    };
    let violations = license::validate(&session.global, &policy);
    if !violations.is_empty() {
        tracing::debug!("{} license violations", violations.len());
    }

    let graph = select_graph(session, &opts.targets, opts.no_tests)?;
    let platforms = target_platforms(&opts.platforms)?;
    let plan = BuildPlan::new(&graph, &session.global, workspace, &platforms)?;
    tracing::debug!("build plan has {} units", plan.len());

    let fingerprint_path = workspace.fingerprint_path();
    let mut cache = FingerprintCache::load_or_default(&fingerprint_path);
    let libraries = LibraryResolver::new(session.fetcher.clone(), config.maven_repository());
    let jobs = opts.jobs.filter(|&j| j > 0).unwrap_or_else(|| config.jobs());

    let mut executor = Executor::new(&session.global, registry, &libraries, &cache)
        .jobs(jobs)
        .clean(opts.clean)
        .cancellation(cancel);
    if let Some(observer) = observer {
        executor = executor.observer(observer);
    }
    let report = executor.execute(&plan)?;

    report.record_fingerprints(&mut cache);
    cache
        .save(&fingerprint_path)
        .with_context(|| format!("failed to save fingerprints to {}", fingerprint_path.display()))?;

    Ok(BuildResult { violations, report })
}
