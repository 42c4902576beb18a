//! Code rank analyzer.
//!
//! Builds a directed dependency graph over user-defined types and free
//! functions from the configured relation strategies, then computes a
//! damped PageRank-style fixed point forward (`cr`, rank flowing from
//! dependents to dependencies) and over the transposed graph (`rcr`).

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::core::config::CodeRankStrategy;
use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{CallableKind, NodeId, Project, TypeId};

const BASE_RANK: f64 = 0.15;
const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 200;
const CONVERGENCE_DELTA: f64 = 1e-9;

/// Forward (`cr`) and reverse (`rcr`) dependency rank per user-defined
/// type and function. Nodes with no incident edges keep the damping-only
/// baseline rank; placeholder types never enter the graph.
pub struct CodeRankAnalyzer {
    strategies: Vec<CodeRankStrategy>,
    ranks: IndexMap<NodeId, (f64, f64)>,
}

impl Default for CodeRankAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeRankAnalyzer {
    /// Create the analyzer with the default strategy set (inheritance).
    pub fn new() -> Self {
        Self::with_strategies(vec![CodeRankStrategy::Inheritance])
    }

    /// Create the analyzer with an explicit strategy set (the
    /// `coderank-mode` option).
    pub fn with_strategies(strategies: Vec<CodeRankStrategy>) -> Self {
        Self {
            strategies,
            ranks: IndexMap::new(),
        }
    }

    fn collect_edges(&self, project: &Project) -> IndexSet<(NodeId, NodeId)> {
        let mut edges = IndexSet::new();
        let user_defined =
            |ty: TypeId| -> bool { project.type_def(ty).user_defined };
        let add = |edges: &mut IndexSet<(NodeId, NodeId)>, from: NodeId, to: TypeId| {
            if user_defined(to) && from != NodeId::Type(to) {
                edges.insert((from, NodeId::Type(to)));
            }
        };

        for strategy in &self.strategies {
            match strategy {
                CodeRankStrategy::Inheritance => {
                    for ty in project.types().filter(|t| t.user_defined) {
                        if let Some(parent) = ty.parent {
                            add(&mut edges, NodeId::Type(ty.id), parent);
                        }
                        for iface in &ty.interfaces {
                            add(&mut edges, NodeId::Type(ty.id), *iface);
                        }
                    }
                }
                CodeRankStrategy::Property => {
                    for ty in project.types().filter(|t| t.user_defined) {
                        for property in &ty.properties {
                            if let Some(target) = property.type_ref {
                                add(&mut edges, NodeId::Type(ty.id), target);
                            }
                        }
                    }
                }
                CodeRankStrategy::Method => {
                    for callable in project.callables() {
                        let source = match callable.kind {
                            CallableKind::Method { owner, .. } => {
                                if !user_defined(owner) {
                                    continue;
                                }
                                NodeId::Type(owner)
                            }
                            CallableKind::Function { .. } => NodeId::Callable(callable.id),
                        };
                        for param in &callable.params {
                            if let Some(target) = param.type_ref {
                                add(&mut edges, source, target);
                            }
                        }
                        if let Some(target) = callable.return_type {
                            add(&mut edges, source, target);
                        }
                        for target in &callable.throws {
                            add(&mut edges, source, *target);
                        }
                    }
                }
            }
        }
        edges
    }
}

impl MetricsAnalyzer for CodeRankAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::CodeRank
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.ranks.clear();

        let mut nodes: Vec<NodeId> = Vec::new();
        for ty in project.types().filter(|t| t.user_defined) {
            nodes.push(NodeId::Type(ty.id));
        }
        for callable in project.callables() {
            if matches!(callable.kind, CallableKind::Function { .. }) {
                nodes.push(NodeId::Callable(callable.id));
            }
        }

        let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
        let mut indices: IndexMap<NodeId, NodeIndex> = IndexMap::new();
        for node in &nodes {
            indices.insert(*node, graph.add_node(*node));
        }
        for (from, to) in self.collect_edges(project) {
            graph.add_edge(indices[&from], indices[&to], ());
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "computing code rank"
        );

        let forward = fixed_point_ranks(&graph, Direction::Outgoing);
        let reverse = fixed_point_ranks(&graph, Direction::Incoming);
        for node in &nodes {
            let index = indices[node].index();
            self.ranks.insert(*node, (forward[index], reverse[index]));
        }
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        self.ranks
            .get(&node)
            .map(|(cr, rcr)| {
                MetricSet::new()
                    .with_float("cr", *cr)
                    .with_float("rcr", *rcr)
            })
            .unwrap_or_default()
    }
}

/// PageRank fixed point: `rank(v) = 0.15 + 0.85 * sum(rank(u) / outdeg(u))`
/// over predecessors `u` of `v`. Passing `Incoming` as the flow direction
/// ranks the transposed graph without rebuilding it.
fn fixed_point_ranks(graph: &DiGraph<NodeId, ()>, flow: Direction) -> Vec<f64> {
    let n = graph.node_count();
    let mut ranks = vec![BASE_RANK; n];
    let out_degree: Vec<usize> = graph
        .node_indices()
        .map(|v| graph.edges_directed(v, flow).count())
        .collect();

    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![BASE_RANK; n];
        for edge in graph.edge_references() {
            let (u, v) = match flow {
                Direction::Outgoing => (edge.source(), edge.target()),
                Direction::Incoming => (edge.target(), edge.source()),
            };
            next[v.index()] += DAMPING * ranks[u.index()] / out_degree[u.index()] as f64;
        }
        let delta = ranks
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        ranks = next;
        if delta < CONVERGENCE_DELTA {
            break;
        }
    }
    ranks
}
