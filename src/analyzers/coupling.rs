//! Object coupling analyzer: afferent/efferent coupling per type plus
//! project-wide call-site and fan-out totals.

use indexmap::{IndexMap, IndexSet};

use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{CallableKind, NodeId, Project, TypeId};

#[derive(Debug, Clone, Default)]
struct TypeCoupling {
    efferent: IndexSet<TypeId>,
    afferent: IndexSet<TypeId>,
}

/// Per-type `ca` (types depending on this type), `ce` (types this type
/// depends on), and `cbo` (deduplicated union of both). A collaborator
/// counts once per distinct type regardless of how many references exist,
/// and references to placeholder types still count.
///
/// Project metrics: `calls` (total call sites) and `fanout` (distinct
/// referenced types summed per caller, a type with all its methods being
/// one caller and each free function another).
#[derive(Default)]
pub struct CouplingAnalyzer {
    types: IndexMap<TypeId, TypeCoupling>,
    calls: i64,
    fanout: i64,
}

impl CouplingAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsAnalyzer for CouplingAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Coupling
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.types.clear();
        self.calls = 0;
        self.fanout = 0;

        for ty in project.types() {
            if ty.user_defined {
                self.types.entry(ty.id).or_default();
            }
        }

        for ty in project.types() {
            if !ty.user_defined {
                continue;
            }
            let deps = project.type_dependencies(ty.id);
            self.fanout += deps.len() as i64;
            for dep in deps {
                self.types[&ty.id].efferent.insert(dep);
                if let Some(peer) = self.types.get_mut(&dep) {
                    peer.afferent.insert(ty.id);
                }
            }
        }

        for callable in project.callables() {
            match callable.kind {
                CallableKind::Method { owner, .. } => {
                    if project.type_def(owner).user_defined {
                        self.calls += project.call_count(callable.id) as i64;
                    }
                }
                CallableKind::Function { .. } => {
                    self.calls += project.call_count(callable.id) as i64;
                    self.fanout += project.callable_type_refs(callable.id).len() as i64;
                }
            }
        }
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        let NodeId::Type(id) = node else {
            return MetricSet::new();
        };
        self.types
            .get(&id)
            .map(|coupling| {
                let union: IndexSet<&TypeId> = coupling
                    .efferent
                    .iter()
                    .chain(coupling.afferent.iter())
                    .collect();
                MetricSet::new()
                    .with_int("ca", coupling.afferent.len() as i64)
                    .with_int("cbo", union.len() as i64)
                    .with_int("ce", coupling.efferent.len() as i64)
            })
            .unwrap_or_default()
    }

    fn project_metrics(&self) -> MetricSet {
        MetricSet::new()
            .with_int("calls", self.calls)
            .with_int("fanout", self.fanout)
    }
}
