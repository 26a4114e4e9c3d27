//! Dependency graph over every project and distribution of the merged
//! namespace.
//!
//! Edges point from a dependency to its dependent, so a topological order
//! lists dependencies first. Libraries are not nodes; they are recorded on
//! the nodes that use them.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use crate::core::entity_id::EntityId;
use crate::core::global::{GlobalManifest, LookupError};
use crate::core::placeholder;
use crate::core::project::ProjectKind;
use crate::core::reference::Reference;
use crate::core::suite::EntityKind;
use crate::resolver::errors::ResolveError;

/// Whether a dependency is needed to build the dependent or only to
/// assemble or run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Build,
    Runtime,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Build => write!(f, "build"),
            EdgeKind::Runtime => write!(f, "runtime"),
        }
    }
}

/// A dependent-to-dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub from: EntityId,
    pub to: EntityId,
    pub kind: EdgeKind,
}

/// A buildable declaration.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: EntityId,
    pub kind: EntityKind,
    /// (suite load index, declaration index)
    pub ordinal: (usize, usize),
    /// Libraries this node consumes, first use first.
    pub libraries: Vec<EntityId>,
    /// Outputs differ per target platform.
    pub platform_specific: bool,
    pub test: bool,
    /// Declared by a binary suite; never built.
    pub prebuilt: bool,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The validated dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, EdgeKind>,
    index: HashMap<EntityId, NodeIndex>,
}

impl DependencyGraph {
    fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add `dependent -> dependency`, collapsing duplicates. `Build`
    /// dominates `Runtime`.
    fn add_edge(&mut self, dependent: NodeIndex, dependency: NodeIndex, kind: EdgeKind) {
        match self.graph.find_edge(dependency, dependent) {
            Some(edge) => {
                if kind == EdgeKind::Build {
                    self.graph[edge] = EdgeKind::Build;
                }
            }
            None => {
                self.graph.add_edge(dependency, dependent, kind);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: EntityId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> Vec<&GraphNode> {
        let mut nodes: Vec<&GraphNode> = self.graph.node_weights().collect();
        nodes.sort_by_key(|n| n.ordinal);
        nodes
    }

    fn neighbors(&self, id: EntityId, direction: Direction) -> Vec<(EntityId, EdgeKind)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<(EntityId, EdgeKind)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (self.graph[other].id, *e.weight())
            })
            .collect();
        out.sort_by_key(|(id, _)| self.node(*id).map(|n| n.ordinal));
        out
    }

    /// What `id` depends on.
    pub fn dependencies(&self, id: EntityId) -> Vec<(EntityId, EdgeKind)> {
        self.neighbors(id, Direction::Incoming)
    }

    /// What depends on `id`.
    pub fn dependents(&self, id: EntityId) -> Vec<(EntityId, EdgeKind)> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn edge(&self, dependent: EntityId, dependency: EntityId) -> Option<EdgeKind> {
        let from = *self.index.get(&dependency)?;
        let to = *self.index.get(&dependent)?;
        self.graph.find_edge(from, to).map(|e| self.graph[e])
    }

    /// Every edge, ordered by dependent then dependency.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .map(|e| DependencyEdge {
                from: self.graph[e.target()].id,
                to: self.graph[e.source()].id,
                kind: *e.weight(),
            })
            .collect();
        edges.sort_by_key(|e| {
            (
                self.node(e.from).map(|n| n.ordinal),
                self.node(e.to).map(|n| n.ordinal),
            )
        });
        edges
    }

    /// Deterministic build order, dependencies first.
    pub fn topo_sort(&self) -> Result<Vec<EntityId>, ResolveError> {
        topo_sort(self)
    }

    /// The subgraph of `targets` and everything they transitively depend on.
    pub fn closure(&self, targets: &[EntityId]) -> DependencyGraph {
        let mut keep: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = targets
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect();

        while let Some(idx) = queue.pop_front() {
            if keep.insert(idx) {
                queue.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
            }
        }

        let mut sub = DependencyGraph::default();
        let mut mapping = HashMap::new();
        let mut kept: Vec<NodeIndex> = keep.into_iter().collect();
        kept.sort_by_key(|&idx| self.graph[idx].ordinal);
        for idx in kept {
            mapping.insert(idx, sub.add_node(self.graph[idx].clone()));
        }
        for edge in self.graph.edge_references() {
            let endpoints = (mapping.get(&edge.source()), mapping.get(&edge.target()));
            if let (Some(&from), Some(&to)) = endpoints {
                sub.graph.add_edge(from, to, *edge.weight());
            }
        }
        sub
    }

    /// Drop test-only nodes that no other node needs.
    pub fn without_tests(&self) -> DependencyGraph {
        let targets: Vec<EntityId> = self
            .graph
            .node_weights()
            .filter(|n| !n.test)
            .map(|n| n.id)
            .collect();
        self.closure(&targets)
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        petgraph::dot::Dot::with_config(&self.graph, &[]).to_string()
    }
}

/// Kahn's algorithm with ties broken by declaration ordinal. Nodes left
/// over lie on or behind a cycle; the shortest cycle among them is
/// reported.
pub fn topo_sort(graph: &DependencyGraph) -> Result<Vec<EntityId>, ResolveError> {
    let g = &graph.graph;
    let mut in_degree: HashMap<NodeIndex, usize> = g
        .node_indices()
        .map(|idx| (idx, g.edges_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut ready: BTreeSet<((usize, usize), NodeIndex)> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&idx, _)| (g[idx].ordinal, idx))
        .collect();

    let mut order = Vec::with_capacity(g.node_count());
    while let Some(entry) = ready.pop_first() {
        let idx = entry.1;
        order.push(g[idx].id);
        for dependent in g.neighbors_directed(idx, Direction::Outgoing) {
            if let Some(d) = in_degree.get_mut(&dependent) {
                *d -= 1;
                if *d == 0 {
                    ready.insert((g[dependent].ordinal, dependent));
                }
            }
        }
        in_degree.remove(&idx);
    }

    if order.len() == g.node_count() {
        return Ok(order);
    }

    let remaining: HashSet<NodeIndex> = in_degree.keys().copied().collect();
    let cycle = shortest_cycle(graph, &remaining)
        .unwrap_or_else(|| remaining.iter().map(|&idx| g[idx].id).collect());
    Err(ResolveError::CyclicDependency { cycle })
}

/// Shortest cycle among `remaining`, following dependent -> dependency so
/// the result reads "A needs B needs A".
fn shortest_cycle(
    graph: &DependencyGraph,
    remaining: &HashSet<NodeIndex>,
) -> Option<Vec<EntityId>> {
    let g = &graph.graph;
    let mut starts: Vec<NodeIndex> = remaining.iter().copied().collect();
    starts.sort_by_key(|&idx| g[idx].ordinal);

    let mut best: Option<Vec<NodeIndex>> = None;
    for start in starts {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut found = None;

        'bfs: while let Some(idx) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = g
                .neighbors_directed(idx, Direction::Incoming)
                .filter(|n| remaining.contains(n))
                .collect();
            next.sort_by_key(|&n| g[n].ordinal);
            for n in next {
                if n == start {
                    found = Some(idx);
                    break 'bfs;
                }
                if let std::collections::hash_map::Entry::Vacant(e) = parent.entry(n) {
                    e.insert(idx);
                    queue.push_back(n);
                }
            }
        }

        if let Some(last) = found {
            let mut path = vec![last];
            let mut cur = last;
            while cur != start {
                cur = parent[&cur];
                path.push(cur);
            }
            path.reverse();
            if best.as_ref().is_none_or(|b| path.len() < b.len()) {
                best = Some(path);
            }
        }
    }

    best.map(|path| path.into_iter().map(|idx| g[idx].id).collect())
}

/// What a reference may point at in a given field.
#[derive(Clone, Copy)]
enum Accept {
    /// Projects and distributions become edges, libraries become inputs.
    Any,
    Distribution,
    /// Projects or distributions only.
    Artifact,
}

struct Linker<'g> {
    global: &'g GlobalManifest,
    graph: DependencyGraph,
}

impl Linker<'_> {
    fn lookup(
        &self,
        from: EntityId,
        field: &'static str,
        reference: &Reference,
    ) -> Result<EntityId, ResolveError> {
        self.global
            .resolve(from.suite(), reference)
            .map_err(|e| match e {
                LookupError::Unknown => ResolveError::UnknownDependency {
                    from,
                    field,
                    reference: reference.to_string(),
                },
                LookupError::Ambiguous(candidates) => ResolveError::AmbiguousDependency {
                    from,
                    reference: reference.to_string(),
                    candidates,
                },
            })
    }

    fn link<'r>(
        &mut self,
        from: EntityId,
        field: &'static str,
        references: impl IntoIterator<Item = &'r Reference>,
        edge: EdgeKind,
        accept: Accept,
    ) -> Result<(), ResolveError> {
        for reference in references {
            let target = self.lookup(from, field, reference)?;
            let found = self
                .global
                .kind(target)
                .ok_or_else(|| ResolveError::UnknownDependency {
                    from,
                    field,
                    reference: reference.to_string(),
                })?;

            let expected = match (accept, found) {
                (Accept::Any, _) => None,
                (Accept::Distribution, EntityKind::Distribution) => None,
                (Accept::Distribution, _) => Some("distribution"),
                (Accept::Artifact, EntityKind::Library) => Some("project or distribution"),
                (Accept::Artifact, _) => None,
            };
            if let Some(expected) = expected {
                return Err(ResolveError::KindMismatch {
                    from,
                    field,
                    target,
                    expected,
                    found,
                });
            }

            let Some(&dependent) = self.graph.index.get(&from) else {
                continue;
            };
            if found == EntityKind::Library {
                let node = &mut self.graph.graph[dependent];
                if !node.libraries.contains(&target) {
                    node.libraries.push(target);
                }
            } else if let Some(&dependency) = self.graph.index.get(&target) {
                self.graph.add_edge(dependent, dependency, edge);
            }
        }
        Ok(())
    }
}

/// Link every reference of the merged namespace into a graph.
pub fn build_graph(global: &GlobalManifest) -> Result<DependencyGraph, ResolveError> {
    let mut linker = Linker {
        global,
        graph: DependencyGraph::default(),
    };

    for id in global.buildable_ids() {
        let Some(ordinal) = global.ordinal(id) else {
            continue;
        };
        let prebuilt = global.suite_of(id).is_some_and(|s| s.prebuilt);
        let (kind, platform_specific, test) = if let Some(project) = global.project(id) {
            (EntityKind::Project, project.kind == ProjectKind::Native, project.test)
        } else if let Some(dist) = global.distribution(id) {
            (EntityKind::Distribution, dist.native || dist.platform_dependent, dist.test)
        } else {
            continue;
        };
        linker.graph.add_node(GraphNode {
            id,
            kind,
            ordinal,
            libraries: Vec::new(),
            platform_specific,
            test,
            prebuilt,
        });
    }

    for id in global.buildable_ids() {
        if let Some(project) = global.project(id) {
            let build_refs = [
                ("dependencies", &project.dependencies),
                ("annotation-processors", &project.annotation_processors),
                ("build-dependencies", &project.build_dependencies),
            ];
            for (field, references) in build_refs {
                linker.link(id, field, references, EdgeKind::Build, Accept::Any)?;
            }
            for value in project.build_env.values() {
                let references = placeholder::path_references(value).unwrap_or_default();
                linker.link(id, "build-env", &references, EdgeKind::Build, Accept::Any)?;
            }
        } else if let Some(dist) = global.distribution(id) {
            linker.link(id, "dependencies", &dist.dependencies, EdgeKind::Build, Accept::Any)?;
            linker.link(
                id,
                "dist-dependencies",
                &dist.dist_dependencies,
                EdgeKind::Runtime,
                Accept::Distribution,
            )?;
            for reference in &dist.exclude {
                linker.lookup(id, "exclude", reference)?;
            }
            for rule in &dist.layout {
                let references = rule.artifact_refs();
                linker.link(id, "layout", references, EdgeKind::Runtime, Accept::Artifact)?;
            }
        }
    }

    let mut graph = linker.graph;
    check_language_versions(&graph, global)?;
    propagate_platform_specific(&mut graph);
    tracing::debug!(
        "dependency graph: {} nodes, {} edges",
        graph.graph.node_count(),
        graph.graph.edge_count()
    );
    Ok(graph)
}

/// A project and the projects it builds against must share a language level.
fn check_language_versions(
    graph: &DependencyGraph,
    global: &GlobalManifest,
) -> Result<(), ResolveError> {
    for node in graph.nodes() {
        let Some(range) = global.project(node.id).and_then(|p| p.language_version) else {
            continue;
        };
        for (dep, kind) in graph.dependencies(node.id) {
            if kind != EdgeKind::Build {
                continue;
            }
            if let Some(dep_range) = global.project(dep).and_then(|p| p.language_version) {
                if !range.intersects(&dep_range) {
                    return Err(ResolveError::ConstraintConflict {
                        project: node.id,
                        project_range: range.to_string(),
                        dependency: dep,
                        dependency_range: dep_range.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Anything downstream of a platform-specific node is platform-specific.
fn propagate_platform_specific(graph: &mut DependencyGraph) {
    let mut queue: VecDeque<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|&idx| graph.graph[idx].platform_specific)
        .collect();

    while let Some(idx) = queue.pop_front() {
        let dependents: Vec<NodeIndex> =
            graph.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        for dependent in dependents {
            if !graph.graph[dependent].platform_specific {
                graph.graph[dependent].platform_specific = true;
                queue.push_back(dependent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::global::ResolvedSuite;
    use crate::resolver::namespace::merge_namespace;
    use crate::test_support::SuiteFixture;
    use tempfile::TempDir;

    fn global(tmp: &TempDir, fixtures: Vec<SuiteFixture>) -> GlobalManifest {
        let suites = fixtures
            .into_iter()
            .enumerate()
            .map(|(i, f)| ResolvedSuite::local(f.load(&tmp.path().join(format!("s{}", i)))))
            .collect();
        merge_namespace(suites).unwrap()
    }

    fn id(s: &str) -> EntityId {
        EntityId::parse(s).unwrap()
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("demo")
                .project("P1", &[])
                .project("P2", &["P1"])
                .project("Q", &[])],
        );
        let graph = build_graph(&g).unwrap();
        let order = graph.topo_sort().unwrap();
        assert_eq!(order, [id("demo:P1"), id("demo:P2"), id("demo:Q")]);
    }

    #[test]
    fn test_every_edge_points_backwards_in_order() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![
                SuiteFixture::new("root")
                    .distribution("X", &["C"])
                    .project("C", &["B", "tools:T"])
                    .project("B", &["A"])
                    .project("A", &[]),
                SuiteFixture::new("tools").project("T", &[]),
            ],
        );
        let graph = build_graph(&g).unwrap();
        let order = graph.topo_sort().unwrap();
        assert_eq!(order.len(), graph.len());

        let pos = |e: EntityId| order.iter().position(|&o| o == e).unwrap();
        for edge in graph.edges() {
            assert!(pos(edge.to) < pos(edge.from), "{} before {}", edge.to, edge.from);
        }
    }

    #[test]
    fn test_libraries_are_node_inputs() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![
                SuiteFixture::new("root").project("P", &["L", "L"]),
                SuiteFixture::new("lib").library("L"),
            ],
        );
        let graph = build_graph(&g).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(id("root:P")).unwrap().libraries, [id("lib:L")]);
    }

    #[test]
    fn test_node_serializes_as_json() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("demo").project("P", &[]).distribution("X", &["P"])],
        );
        let graph = build_graph(&g).unwrap();

        let node = serde_json::to_value(graph.node(id("demo:X")).unwrap()).unwrap();
        assert_eq!(node["id"], "demo:X");
        assert_eq!(node["kind"], "distribution");
        assert_eq!(node["prebuilt"], false);
    }

    #[test]
    fn test_unknown_and_ambiguous_dependencies() {
        let tmp = TempDir::new().unwrap();
        let g = global(&tmp, vec![SuiteFixture::new("root").project("P", &["Missing"])]);
        match build_graph(&g).unwrap_err() {
            ResolveError::UnknownDependency { from, field, reference } => {
                assert_eq!(from, id("root:P"));
                assert_eq!(field, "dependencies");
                assert_eq!(reference, "Missing");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![
                SuiteFixture::new("root").project("P", &["S"]),
                SuiteFixture::new("a").project("S", &[]),
                SuiteFixture::new("b").project("S", &[]),
            ],
        );
        assert!(matches!(
            build_graph(&g).unwrap_err(),
            ResolveError::AmbiguousDependency { candidates, .. } if candidates.len() == 2
        ));
    }

    #[test]
    fn test_dist_dependency_must_be_distribution() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root")
                .project("P", &[])
                .raw("[[distribution]]\nname = \"X\"\ndist-dependencies = [\"P\"]\n")],
        );
        match build_graph(&g).unwrap_err() {
            ResolveError::KindMismatch { expected, found, .. } => {
                assert_eq!(expected, "distribution");
                assert_eq!(found, EntityKind::Project);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_build_dominates_runtime() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root")
                .project("P", &[])
                .raw(
                    "[[distribution]]\nname = \"X\"\ndependencies = [\"P\"]\n\n\
                     [[distribution.layout]]\ndest = \"./\"\nsources = [\"dependency:P\"]\n",
                )],
        );
        let graph = build_graph(&g).unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edge(id("root:X"), id("root:P")), Some(EdgeKind::Build));
    }

    #[test]
    fn test_layout_and_path_placeholders_add_edges() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root")
                .raw(
                    "[[project]]\nname = \"N\"\nkind = \"native\"\n\n\
                     [[project]]\nname = \"M\"\n\n\
                     [[project]]\nname = \"E\"\nbuild-env = { M_HOME = \"<path:M>\" }\n",
                )
                .raw(
                    "[[distribution]]\nname = \"X\"\n\n\
                     [[distribution.layout]]\ndest = \"lib/\"\n\
                     sources = [\"dependency:N/<lib:n>\"]\n",
                )],
        );
        let graph = build_graph(&g).unwrap();
        assert_eq!(graph.edge(id("root:E"), id("root:M")), Some(EdgeKind::Build));
        assert_eq!(graph.edge(id("root:X"), id("root:N")), Some(EdgeKind::Runtime));
        assert!(graph.node(id("root:X")).unwrap().platform_specific);
        assert!(!graph.node(id("root:E")).unwrap().platform_specific);
    }

    #[test]
    fn test_cycle_reports_shortest_loop() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root")
                .project("A", &["B"])
                .project("B", &["C"])
                .project("C", &["B"])
                .project("D", &["A"])],
        );
        let graph = build_graph(&g).unwrap();
        match graph.topo_sort().unwrap_err() {
            ResolveError::CyclicDependency { cycle } => {
                assert_eq!(cycle, [id("root:B"), id("root:C")]);
                // every listed node reaches the next one
                for pair in cycle.windows(2) {
                    assert!(graph.edge(pair[0], pair[1]).is_some());
                }
                assert!(graph.edge(cycle[1], cycle[0]).is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tmp = TempDir::new().unwrap();
        let g = global(&tmp, vec![SuiteFixture::new("root").project("A", &["A"])]);
        let err = build_graph(&g).unwrap().topo_sort().unwrap_err();
        assert_eq!(err.to_string(), "cyclic dependency: root:A -> root:A");
    }

    #[test]
    fn test_language_version_conflict() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root").raw(
                "[[project]]\nname = \"Old\"\nlanguage-version = \"6..7\"\n\n\
                 [[project]]\nname = \"New\"\nlanguage-version = \"11+\"\n\
                 dependencies = [\"Old\"]\n",
            )],
        );
        assert!(matches!(
            build_graph(&g).unwrap_err(),
            ResolveError::ConstraintConflict { project, .. } if project == id("root:New")
        ));
    }

    #[test]
    fn test_closure_and_test_filtering() {
        let tmp = TempDir::new().unwrap();
        let g = global(
            &tmp,
            vec![SuiteFixture::new("root")
                .project("A", &[])
                .project("B", &["A"])
                .project("C", &[])
                .raw("[[project]]\nname = \"T\"\ntest = true\ndependencies = [\"B\"]\n")],
        );
        let graph = build_graph(&g).unwrap();

        let sub = graph.closure(&[id("root:B")]);
        assert_eq!(sub.topo_sort().unwrap(), [id("root:A"), id("root:B")]);

        let no_tests = graph.without_tests();
        assert!(!no_tests.contains(id("root:T")));
        assert_eq!(no_tests.len(), 3);
    }

    #[test]
    fn test_dot_output_names_nodes() {
        let tmp = TempDir::new().unwrap();
        let fixture = SuiteFixture::new("root").project("A", &[]).project("B", &["A"]);
        let g = global(&tmp, vec![fixture]);
        let dot = build_graph(&g).unwrap().to_dot();
        assert!(dot.contains("root:A"));
        assert!(dot.contains("build"));
    }
}
