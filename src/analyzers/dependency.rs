//! Namespace dependency analyzer: abstraction, instability, and distance
//! from the main sequence.

use indexmap::{IndexMap, IndexSet};

use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{NamespaceId, NodeId, Project, TypeKind};

#[derive(Debug, Clone, Default)]
struct NamespaceState {
    total: i64,
    concrete: i64,
    abstracts: i64,
    efferent: IndexSet<NamespaceId>,
    afferent: IndexSet<NamespaceId>,
}

/// Per-namespace coupling aggregates: `tc`/`cc`/`ac` type counts, `ca`/`ce`
/// distinct peer-namespace coupling, and the derived ratios `a`
/// (abstraction), `i` (instability), and `d` (distance from the main
/// sequence, `|a + i - 1|`).
///
/// Synthetic namespaces such as `+global` participate: they accrue afferent
/// coupling from every namespace referencing their placeholder types.
#[derive(Default)]
pub struct DependencyAnalyzer {
    namespaces: IndexMap<NamespaceId, NamespaceState>,
}

impl DependencyAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsAnalyzer for DependencyAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Dependency
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.namespaces.clear();
        for ns in project.namespaces() {
            self.namespaces.insert(ns.id, NamespaceState::default());
        }

        for ty in project.types() {
            if !ty.user_defined {
                continue;
            }
            let home = ty.namespace;
            {
                let state = &mut self.namespaces[&home];
                state.total += 1;
                // interfaces count as abstract types
                if ty.is_abstract || ty.kind == TypeKind::Interface {
                    state.abstracts += 1;
                } else {
                    state.concrete += 1;
                }
            }
            for dep in project.type_dependencies(ty.id) {
                let peer = project.type_def(dep).namespace;
                if peer == home {
                    continue;
                }
                self.namespaces[&home].efferent.insert(peer);
                self.namespaces[&peer].afferent.insert(home);
            }
        }
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        let NodeId::Namespace(id) = node else {
            return MetricSet::new();
        };
        let Some(state) = self.namespaces.get(&id) else {
            return MetricSet::new();
        };
        let ca = state.afferent.len() as i64;
        let ce = state.efferent.len() as i64;
        let abstraction = if state.total > 0 {
            state.abstracts as f64 / state.total as f64
        } else {
            0.0
        };
        let instability = if ca + ce > 0 {
            ce as f64 / (ca + ce) as f64
        } else {
            0.0
        };
        let distance = (abstraction + instability - 1.0).abs();
        MetricSet::new()
            .with_int("tc", state.total)
            .with_int("cc", state.concrete)
            .with_int("ac", state.abstracts)
            .with_int("ca", ca)
            .with_int("ce", ce)
            .with_float("a", abstraction)
            .with_float("i", instability)
            .with_float("d", distance)
    }
}
