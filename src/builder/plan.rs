//! Build plan generation.
//!
//! A `BuildPlan` lists one unit per node and target platform in
//! topological order. Platform-specific nodes get a unit for every
//! requested platform; everything else is built once and shared.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::external::BuildKind;
use crate::core::entity_id::EntityId;
use crate::core::global::GlobalManifest;
use crate::core::platform::Platform;
use crate::core::project::ProjectKind;
use crate::core::workspace::Workspace;
use crate::resolver::errors::ResolveError;
use crate::resolver::graph::{DependencyGraph, EdgeKind};

/// What the executor does for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Dispatch to the external builder for the kind.
    Build(BuildKind),
    /// Compose a distribution layout.
    Compose,
    /// Declared by a binary suite; the output already exists.
    Prebuilt,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Build(kind) => write!(f, "build ({})", kind),
            StepKind::Compose => write!(f, "compose"),
            StepKind::Prebuilt => write!(f, "prebuilt"),
        }
    }
}

/// A predecessor of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitDependency {
    /// Index into `BuildPlan::units`.
    pub unit: usize,
    pub node: EntityId,
    pub kind: EdgeKind,
}

/// One node built for one platform.
#[derive(Debug, Clone, Serialize)]
pub struct PlanUnit {
    pub node: EntityId,
    pub step: StepKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip)]
    pub ordinal: (usize, usize),
    /// Predecessors in declaration order.
    pub dependencies: Vec<UnitDependency>,
    pub output_dir: PathBuf,
    /// Libraries passed to the builder.
    pub libraries: Vec<EntityId>,
    /// Constituents left out of an archive.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<EntityId>,
}

impl PlanUnit {
    /// Predecessors that must succeed before this unit may start.
    ///
    /// Runtime edges gate distributions, so a distribution whose
    /// `dist-dependencies` failed is skipped.
    pub fn gates(&self) -> impl Iterator<Item = &UnitDependency> {
        let step = self.step;
        self.dependencies.iter().filter(move |dep| match step {
            StepKind::Compose | StepKind::Build(BuildKind::Archive) => true,
            StepKind::Build(_) => dep.kind == EdgeKind::Build,
            StepKind::Prebuilt => false,
        })
    }

    /// Predecessors whose artifacts are handed to the builder.
    pub fn inputs(&self) -> impl Iterator<Item = &UnitDependency> {
        self.dependencies
            .iter()
            .filter(|dep| dep.kind == EdgeKind::Build && !self.excluded.contains(&dep.node))
    }

    pub fn label(&self) -> String {
        match self.platform {
            Some(p) => format!("{} ({})", self.node, p),
            None => self.node.to_string(),
        }
    }
}

/// A complete build plan.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub platforms: Vec<Platform>,
    /// Units in execution order.
    pub units: Vec<PlanUnit>,
}

impl BuildPlan {
    /// Plan every node of `graph` for the given platforms.
    pub fn new(
        graph: &DependencyGraph,
        global: &GlobalManifest,
        workspace: &Workspace,
        platforms: &[Platform],
    ) -> Result<BuildPlan, ResolveError> {
        let order = graph.topo_sort()?;
        let mut units: Vec<PlanUnit> = Vec::new();
        let mut index: HashMap<(EntityId, Option<Platform>), usize> = HashMap::new();

        for id in order {
            let Some(node) = graph.node(id) else {
                continue;
            };
            let targets: Vec<Option<Platform>> = if node.platform_specific {
                platforms.iter().copied().map(Some).collect()
            } else {
                vec![None]
            };

            for platform in targets {
                let mut dependencies = Vec::new();
                for (dep, kind) in graph.dependencies(id) {
                    let dep_platform = match graph.node(dep) {
                        Some(n) if n.platform_specific => platform,
                        _ => None,
                    };
                    if let Some(&unit) = index.get(&(dep, dep_platform)) {
                        dependencies.push(UnitDependency { unit, node: dep, kind });
                    }
                }

                let Some((step, output_dir)) =
                    step_for(global, workspace, id, node.prebuilt, platform, platforms.len())
                else {
                    continue;
                };

                let excluded = excluded_ids(global, id);
                let libraries = node
                    .libraries
                    .iter()
                    .copied()
                    .filter(|lib| !excluded.contains(lib))
                    .collect();

                index.insert((id, platform), units.len());
                units.push(PlanUnit {
                    node: id,
                    step,
                    platform,
                    ordinal: node.ordinal,
                    dependencies,
                    output_dir,
                    libraries,
                    excluded,
                });
            }
        }

        tracing::debug!("build plan: {} units for {} platform(s)", units.len(), platforms.len());
        Ok(BuildPlan {
            platforms: platforms.to_vec(),
            units,
        })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Index of the unit building `node` for `platform`.
    pub fn unit_index(&self, node: EntityId, platform: Option<Platform>) -> Option<usize> {
        self.units
            .iter()
            .position(|u| u.node == node && u.platform == platform)
    }

    /// Nodes in execution order, each listed once.
    pub fn build_order(&self) -> Vec<EntityId> {
        let mut order: Vec<EntityId> = Vec::new();
        for unit in &self.units {
            if !order.contains(&unit.node) {
                order.push(unit.node);
            }
        }
        order
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize build plan")
    }

    /// Write the plan as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

fn step_for(
    global: &GlobalManifest,
    workspace: &Workspace,
    id: EntityId,
    prebuilt: bool,
    platform: Option<Platform>,
    platform_count: usize,
) -> Option<(StepKind, PathBuf)> {
    let suite = &global.suite_of(id)?.suite;

    if let Some(project) = global.project(id) {
        if prebuilt {
            return Some((StepKind::Prebuilt, suite.root.join(&project.dir)));
        }
        let kind = match project.kind {
            ProjectKind::Managed => BuildKind::Managed,
            ProjectKind::Native => BuildKind::Native,
            ProjectKind::Data => BuildKind::Data,
        };
        let output_dir = match (&project.output, platform) {
            (Some(output), Some(p)) if platform_count > 1 => {
                suite.root.join(output).join(p.to_string())
            }
            (Some(output), _) => suite.root.join(output),
            (None, _) => workspace.node_output_dir(platform, id.suite(), id.name()),
        };
        return Some((StepKind::Build(kind), output_dir));
    }

    let dist = global.distribution(id)?;
    if prebuilt {
        return Some((StepKind::Prebuilt, suite.root.join(&dist.name)));
    }
    let step = if dist.has_layout() {
        StepKind::Compose
    } else {
        StepKind::Build(BuildKind::Archive)
    };
    Some((step, workspace.node_output_dir(platform, id.suite(), id.name())))
}

fn excluded_ids(global: &GlobalManifest, id: EntityId) -> Vec<EntityId> {
    let Some(dist) = global.distribution(id) else {
        return Vec::new();
    };
    dist.exclude
        .iter()
        .filter_map(|r| global.resolve(id.suite(), r).ok())
        .collect()
}
