//! Parallel execution of a build plan.
//!
//! A single coordinator owns the scheduling state and is the only writer of
//! the outcome table. Build steps run on a rayon pool bounded by `jobs`;
//! layout composition and prebuilt lookups run on the coordinator. A unit
//! starts once every predecessor it is gated on has succeeded. When one
//! fails, everything gated on it is skipped and independent units carry on.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::builder::artifact::{ArtifactHandle, BuildFailed, NodeOutcome};
use crate::builder::events::{BuildEvent, BuildObserver};
use crate::builder::external::{
    BuildError, BuildKind, BuildOptions, BuildOutput, BuildRequest, BuilderRegistry,
};
use crate::builder::fingerprint::{unit_key, FingerprintCache, FingerprintInputs};
use crate::builder::plan::{BuildPlan, PlanUnit, StepKind};
use crate::core::entity_id::EntityId;
use crate::core::global::GlobalManifest;
use crate::core::placeholder::{self, Resolver};
use crate::core::platform::Platform;
use crate::core::project::ProjectKind;
use crate::core::reference::Reference;
use crate::layout::LayoutComposer;
use crate::sources::library::LibraryResolver;
use crate::util::hash::sha256_tree;

/// Shared flag that stops new units from being dispatched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How one plan unit ended.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub node: EntityId,
    pub platform: Option<Platform>,
    pub step: StepKind,
    pub outcome: NodeOutcome,
}

/// Result of executing a plan.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// In plan order.
    pub units: Vec<UnitReport>,
    pub duration: Duration,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        !self.cancelled && self.units.iter().all(|u| u.outcome.is_success())
    }

    pub fn built(&self) -> usize {
        self.count(|o| o.is_success())
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped { .. }))
    }

    fn count(&self, f: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| f(&u.outcome)).count()
    }

    pub fn failures(&self) -> Vec<&BuildFailed> {
        self.units
            .iter()
            .filter_map(|u| match &u.outcome {
                NodeOutcome::Failed(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self, node: EntityId, platform: Option<Platform>) -> Option<&NodeOutcome> {
        self.units
            .iter()
            .find(|u| u.node == node && u.platform == platform)
            .map(|u| &u.outcome)
    }

    pub fn artifact(&self, node: EntityId, platform: Option<Platform>) -> Option<&ArtifactHandle> {
        self.outcome(node, platform)?.artifact()
    }

    /// Store the fingerprints of every successful build step.
    pub fn record_fingerprints(&self, cache: &mut FingerprintCache) {
        for unit in &self.units {
            if let (StepKind::Build(_), NodeOutcome::Built(handle)) = (unit.step, &unit.outcome) {
                cache.record(unit_key(unit.node, unit.platform), handle.clone());
            }
        }
    }
}

/// Scheduling state, owned by the coordinator.
struct Schedule {
    /// Gating predecessors that have not succeeded yet.
    pending: Vec<usize>,
    /// Units gated on each unit.
    dependents: Vec<Vec<usize>>,
    /// Ready units keyed by declaration ordinal.
    ready: BTreeSet<((usize, usize), usize)>,
}

impl Schedule {
    fn new(plan: &BuildPlan) -> Self {
        let mut pending = vec![0; plan.len()];
        let mut dependents = vec![Vec::new(); plan.len()];
        let mut ready = BTreeSet::new();
        for (i, unit) in plan.units.iter().enumerate() {
            for gate in unit.gates() {
                pending[i] += 1;
                dependents[gate.unit].push(i);
            }
            if pending[i] == 0 {
                ready.insert((unit.ordinal, i));
            }
        }
        Schedule {
            pending,
            dependents,
            ready,
        }
    }

    fn next_ready(&mut self) -> Option<usize> {
        self.ready.pop_first().map(|(_, i)| i)
    }

    fn succeeded(&mut self, plan: &BuildPlan, i: usize) {
        for &d in &self.dependents[i] {
            self.pending[d] -= 1;
            if self.pending[d] == 0 {
                self.ready.insert((plan.units[d].ordinal, d));
            }
        }
    }
}

/// Runs a `BuildPlan`.
pub struct Executor<'a> {
    global: &'a GlobalManifest,
    registry: &'a BuilderRegistry,
    libraries: &'a LibraryResolver,
    cache: &'a FingerprintCache,
    jobs: usize,
    clean: bool,
    cancel: CancellationToken,
    observer: Option<&'a dyn BuildObserver>,
}

impl<'a> Executor<'a> {
    pub fn new(
        global: &'a GlobalManifest,
        registry: &'a BuilderRegistry,
        libraries: &'a LibraryResolver,
        cache: &'a FingerprintCache,
    ) -> Self {
        Executor {
            global,
            registry,
            libraries,
            cache,
            jobs: 1,
            clean: false,
            cancel: CancellationToken::new(),
            observer: None,
        }
    }

    /// Number of build steps that may run at once.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Ignore the fingerprint cache.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn observer(mut self, observer: &'a dyn BuildObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(observer) = self.observer {
            observer.on_event(&event);
        }
    }

    /// Execute every unit of `plan`.
    pub fn execute(&self, plan: &BuildPlan) -> Result<BuildReport> {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("quay-build-{}", i))
            .build()
            .context("failed to start build workers")?;

        self.emit(BuildEvent::BuildStarted {
            units: plan.len(),
            platforms: plan.platforms.clone(),
        });

        let table: Vec<OnceLock<NodeOutcome>> = (0..plan.len()).map(|_| OnceLock::new()).collect();
        let mut schedule = Schedule::new(plan);
        let (tx, rx) = mpsc::channel::<(usize, NodeOutcome)>();

        pool.in_place_scope(|scope| {
            let mut running = 0usize;
            loop {
                while running < self.jobs && !self.cancel.is_cancelled() {
                    let Some(i) = schedule.next_ready() else {
                        break;
                    };
                    let unit = &plan.units[i];
                    self.emit(BuildEvent::NodeStarted {
                        node: unit.node,
                        platform: unit.platform,
                    });

                    match unit.step {
                        StepKind::Build(kind) => {
                            let tx = tx.clone();
                            let table = &table;
                            scope.spawn(move |_| {
                                let build = || self.build_unit(plan, i, kind, table);
                                let outcome = match catch_unwind(AssertUnwindSafe(build)) {
                                    Ok(outcome) => outcome,
                                    Err(_) => failed(unit, "builder panicked".to_string()),
                                };
                                let _ = tx.send((i, outcome));
                            });
                            running += 1;
                        }
                        StepKind::Compose => {
                            let outcome = self.compose_unit(plan, i, &table);
                            self.complete(plan, &table, &mut schedule, i, outcome);
                        }
                        StepKind::Prebuilt => {
                            let outcome = prebuilt_unit(unit);
                            self.complete(plan, &table, &mut schedule, i, outcome);
                        }
                    }
                }

                if running == 0 {
                    break;
                }
                match rx.recv() {
                    Ok((i, outcome)) => {
                        running -= 1;
                        self.complete(plan, &table, &mut schedule, i, outcome);
                    }
                    Err(_) => break,
                }
            }
        });

        let cancelled = self.cancel.is_cancelled();
        let units: Vec<UnitReport> = plan
            .units
            .iter()
            .zip(table)
            .map(|(unit, slot)| UnitReport {
                node: unit.node,
                platform: unit.platform,
                step: unit.step,
                outcome: slot.into_inner().unwrap_or(NodeOutcome::Cancelled),
            })
            .collect();

        let report = BuildReport {
            units,
            duration: start.elapsed(),
            cancelled,
        };
        self.emit(BuildEvent::BuildFinished {
            success: report.success(),
            duration_ms: report.duration.as_millis() as u64,
            built: report.built(),
            failed: report.failed(),
            skipped: report.skipped(),
        });
        Ok(report)
    }

    /// Record an outcome and update everything that waits on it.
    fn complete(
        &self,
        plan: &BuildPlan,
        table: &[OnceLock<NodeOutcome>],
        schedule: &mut Schedule,
        i: usize,
        outcome: NodeOutcome,
    ) {
        let unit = &plan.units[i];
        match &outcome {
            NodeOutcome::Built(handle) => self.emit(BuildEvent::NodeFinished {
                node: unit.node,
                platform: unit.platform,
                path: handle.path.clone(),
                fresh: handle.fresh,
            }),
            NodeOutcome::Failed(err) => {
                tracing::debug!("{}", err);
                self.emit(BuildEvent::NodeFailed {
                    node: unit.node,
                    platform: unit.platform,
                    message: err.cause.clone(),
                });
            }
            NodeOutcome::Skipped { .. } | NodeOutcome::Cancelled => {}
        }

        let success = outcome.is_success();
        let _ = table[i].set(outcome);
        if success {
            schedule.succeeded(plan, i);
        } else {
            self.skip_dependents(plan, table, schedule, i, unit.node);
        }
    }

    /// Mark everything gated on `failed` as skipped, transitively.
    fn skip_dependents(
        &self,
        plan: &BuildPlan,
        table: &[OnceLock<NodeOutcome>],
        schedule: &Schedule,
        failed: usize,
        cause: EntityId,
    ) {
        let mut queue = vec![failed];
        while let Some(i) = queue.pop() {
            for &d in &schedule.dependents[i] {
                if table[d].get().is_some() {
                    continue;
                }
                let unit = &plan.units[d];
                tracing::debug!("skipping {}: {} did not build", unit.label(), cause);
                let _ = table[d].set(NodeOutcome::Skipped {
                    failed_dependency: cause,
                });
                self.emit(BuildEvent::NodeSkipped {
                    node: unit.node,
                    platform: unit.platform,
                    failed_dependency: cause,
                });
                queue.push(d);
            }
        }
    }

    fn build_unit(
        &self,
        plan: &BuildPlan,
        i: usize,
        kind: BuildKind,
        table: &[OnceLock<NodeOutcome>],
    ) -> NodeOutcome {
        let unit = &plan.units[i];
        match self.try_build(unit, kind, table) {
            Ok(handle) => NodeOutcome::Built(handle),
            Err(e) => failed(unit, e.to_string()),
        }
    }

    fn try_build(
        &self,
        unit: &PlanUnit,
        kind: BuildKind,
        table: &[OnceLock<NodeOutcome>],
    ) -> Result<ArtifactHandle, BuildError> {
        let id = unit.node;
        let resolved = self
            .global
            .suite_of(id)
            .ok_or_else(|| BuildError::Other(format!("`{}` is not declared", id)))?;
        let suite_root = &resolved.suite.root;

        let inputs: Vec<ArtifactHandle> = unit
            .inputs()
            .filter_map(|dep| table[dep.unit].get().and_then(NodeOutcome::artifact))
            .cloned()
            .collect();

        let mut library_paths = BTreeMap::new();
        let mut library_digests = Vec::new();
        for &lib in &unit.libraries {
            let library = self
                .global
                .library(lib)
                .ok_or_else(|| BuildError::Library(format!("`{}` is not declared", lib)))?;
            let path = self
                .libraries
                .fetch(lib, library)
                .map_err(|e| BuildError::Library(e.to_string()))?;
            library_digests.push(library.digest.to_string());
            library_paths.insert(lib, path);
        }

        let project = self.global.project(id);
        let (base_dir, source_dirs, processors, options) = if let Some(project) = project {
            let base_dir = suite_root.join(&project.dir);
            let mut source_dirs: Vec<PathBuf> =
                project.source_dirs.iter().map(|d| base_dir.join(d)).collect();
            if source_dirs.is_empty() && project.kind == ProjectKind::Data {
                source_dirs.push(base_dir.clone());
            }

            let processors = project
                .annotation_processors
                .iter()
                .filter_map(|r| self.global.resolve(id.suite(), r).ok())
                .filter_map(|p| inputs.iter().find(|h| h.node == p).map(|h| h.path.clone()))
                .collect();

            let env_resolver = EnvResolver {
                global: self.global,
                from: id,
                platform: unit.platform,
                inputs: &inputs,
                libraries: &library_paths,
            };
            let env = project
                .build_env
                .iter()
                .map(|(key, value)| {
                    Ok((key.clone(), placeholder::substitute(value, &env_resolver)?))
                })
                .collect::<Result<BTreeMap<_, _>, placeholder::PlaceholderError>>()
                .map_err(|e| BuildError::Other(e.to_string()))?;
            let results = project
                .results
                .iter()
                .map(|r| placeholder::expand_for_platform(r, unit.platform))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| BuildError::Other(e.to_string()))?;

            let options = BuildOptions {
                platform: unit.platform,
                output_dir: unit.output_dir.clone(),
                env,
                results,
                language_version: project.language_version,
                main_class: None,
            };
            (base_dir, source_dirs, processors, options)
        } else if let Some(dist) = self.global.distribution(id) {
            let options = BuildOptions {
                platform: unit.platform,
                output_dir: unit.output_dir.clone(),
                results: vec![dist.archive_file_name()],
                main_class: dist.main_class.clone(),
                ..Default::default()
            };
            (suite_root.clone(), Vec::new(), Vec::new(), options)
        } else {
            return Err(BuildError::Other(format!("`{}` is not buildable", id)));
        };

        let builder = self.registry.get(kind).ok_or(BuildError::NoBuilder { kind })?;
        let fingerprint = FingerprintInputs {
            node: id,
            kind,
            builder: builder.name(),
            platform: unit.platform,
            source_dirs: &source_dirs,
            predecessors: inputs.iter().map(|h| h.fingerprint.as_str()).collect(),
            library_digests,
            options: &options,
        }
        .compute()
        .map_err(|e| BuildError::Other(format!("{:#}", e)))?;

        let key = unit_key(id, unit.platform);
        if !self.clean {
            if let Some(handle) = self.cache.fresh(&key, &fingerprint) {
                tracing::debug!("{} is up to date", key);
                return Ok(handle);
            }
        }

        tracing::info!("building {} with {}", unit.label(), builder.name());
        let request = BuildRequest {
            node: id,
            kind,
            base_dir,
            source_dirs,
            inputs,
            libraries: library_paths.into_values().collect(),
            processors,
            options,
        };
        let output = builder.build(&request)?;

        Ok(ArtifactHandle {
            node: id,
            fingerprint,
            path: output.path,
            files: output.files,
            fresh: true,
            platform: unit.platform,
        })
    }

    fn compose_unit(
        &self,
        plan: &BuildPlan,
        i: usize,
        table: &[OnceLock<NodeOutcome>],
    ) -> NodeOutcome {
        let unit = &plan.units[i];
        let artifacts: BTreeMap<EntityId, ArtifactHandle> = unit
            .dependencies
            .iter()
            .filter_map(|dep| {
                let handle = table[dep.unit].get()?.artifact()?;
                Some((dep.node, handle.clone()))
            })
            .collect();

        tracing::info!("composing {}", unit.label());
        let composed = LayoutComposer::new(self.global)
            .compose(unit.node, unit.platform, &artifacts)
            .and_then(|tree| {
                let fingerprint = tree.digest()?;
                tree.materialize(&unit.output_dir)?;
                Ok((tree, fingerprint))
            });

        match composed {
            Ok((tree, fingerprint)) => NodeOutcome::Built(ArtifactHandle {
                node: unit.node,
                fingerprint,
                path: unit.output_dir.clone(),
                files: tree.destinations().into_iter().map(PathBuf::from).collect(),
                fresh: true,
                platform: unit.platform,
            }),
            Err(e) => failed(unit, e.to_string()),
        }
    }
}

fn failed(unit: &PlanUnit, cause: String) -> NodeOutcome {
    NodeOutcome::Failed(BuildFailed {
        node: unit.node,
        platform: unit.platform,
        cause,
    })
}

/// A node from a binary suite: its output ships with the suite.
fn prebuilt_unit(unit: &PlanUnit) -> NodeOutcome {
    let path = &unit.output_dir;
    if !path.exists() {
        return failed(unit, format!("prebuilt output `{}` is missing", path.display()));
    }
    let scanned = BuildOutput::scan(path.clone()).map_err(|e| e.to_string());
    let fingerprint = sha256_tree(path).map_err(|e| format!("{:#}", e));
    match (scanned, fingerprint) {
        (Ok(output), Ok(fingerprint)) => NodeOutcome::Built(ArtifactHandle {
            node: unit.node,
            fingerprint,
            path: output.path,
            files: output.files,
            fresh: false,
            platform: unit.platform,
        }),
        (Err(cause), _) | (_, Err(cause)) => failed(unit, cause),
    }
}

/// Resolves `<path:…>` in a build environment to predecessor outputs and
/// library files.
struct EnvResolver<'r> {
    global: &'r GlobalManifest,
    from: EntityId,
    platform: Option<Platform>,
    inputs: &'r [ArtifactHandle],
    libraries: &'r BTreeMap<EntityId, PathBuf>,
}

impl Resolver for EnvResolver<'_> {
    fn platform(&self) -> Option<Platform> {
        self.platform
    }

    fn resolve_path(&self, reference: &Reference) -> Option<String> {
        let id = self.global.resolve(self.from.suite(), reference).ok()?;
        if let Some(path) = self.libraries.get(&id) {
            return Some(path.display().to_string());
        }
        self.inputs
            .iter()
            .find(|h| h.node == id)
            .map(|h| h.path.display().to_string())
    }
}
