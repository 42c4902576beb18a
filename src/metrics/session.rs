//! Analyzer orchestration.
//!
//! [`AnalysisSession`] owns a set of registered analyzers, resolves their
//! declared prerequisites into a topological run order, injects dependency
//! handles and the shared cache driver, and executes `analyze` once per
//! analyzer. Results stay queryable through the session after the run.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::core::errors::{MetrikError, Result};
use crate::io::cache::CacheDriver;
use crate::metrics::{AnalyzerHandle, AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{NodeId, Project};

/// Registers, wires, and runs a suite of metric analyzers.
#[derive(Default)]
pub struct AnalysisSession {
    analyzers: IndexMap<AnalyzerId, AnalyzerHandle>,
    cache: Option<Arc<dyn CacheDriver>>,
}

impl AnalysisSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cache driver shared by every caching analyzer in the
    /// session.
    pub fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache = Some(driver);
    }

    /// Register an analyzer, replacing any prior registration of the same
    /// analyzer id. Returns the shared handle for direct queries.
    pub fn register<A: MetricsAnalyzer + 'static>(&mut self, analyzer: A) -> AnalyzerHandle {
        let id = analyzer.id();
        let handle: AnalyzerHandle = Arc::new(RwLock::new(analyzer));
        self.analyzers.insert(id, Arc::clone(&handle));
        handle
    }

    /// The handle of a registered analyzer.
    pub fn handle(&self, id: AnalyzerId) -> Option<AnalyzerHandle> {
        self.analyzers.get(&id).cloned()
    }

    /// Run every registered analyzer over the project in dependency order.
    ///
    /// Prerequisite handles are injected before their dependent runs; a
    /// requirement on an unregistered analyzer fails with
    /// [`MetrikError::MissingAnalyzer`] before any traversal starts.
    pub fn run(&mut self, project: &Project) -> Result<()> {
        let order = self.resolve_order()?;
        info!(analyzers = order.len(), "starting analysis run");

        for id in order {
            let handle = self
                .analyzers
                .get(&id)
                .cloned()
                .ok_or_else(|| MetrikError::internal(format!("analyzer '{id}' vanished")))?;
            let required: Vec<AnalyzerId> = handle.read().required_analyzers().to_vec();
            {
                let mut analyzer = handle.write();
                for req in required {
                    let dep = self
                        .analyzers
                        .get(&req)
                        .cloned()
                        .ok_or_else(|| MetrikError::missing_analyzer(id.name(), req.name()))?;
                    analyzer.add_analyzer(dep)?;
                }
                if let Some(driver) = &self.cache {
                    analyzer.set_cache(Arc::clone(driver));
                }
                debug!(analyzer = %id, "running analyzer");
                analyzer.analyze(project)?;
            }
        }
        Ok(())
    }

    /// Metrics recorded for a node by a registered analyzer; empty when the
    /// analyzer is unregistered or never visited the node.
    pub fn node_metrics(&self, analyzer: AnalyzerId, node: NodeId) -> MetricSet {
        self.analyzers
            .get(&analyzer)
            .map(|handle| handle.read().node_metrics(node))
            .unwrap_or_default()
    }

    /// Aggregate metrics of a registered analyzer.
    pub fn project_metrics(&self, analyzer: AnalyzerId) -> MetricSet {
        self.analyzers
            .get(&analyzer)
            .map(|handle| handle.read().project_metrics())
            .unwrap_or_default()
    }

    /// Kahn topological sort over the declared requirements, stable with
    /// respect to registration order.
    fn resolve_order(&self) -> Result<Vec<AnalyzerId>> {
        let ids: Vec<AnalyzerId> = self.analyzers.keys().copied().collect();
        let mut indegree: IndexMap<AnalyzerId, usize> =
            ids.iter().map(|id| (*id, 0)).collect();
        let mut dependents: IndexMap<AnalyzerId, Vec<AnalyzerId>> =
            ids.iter().map(|id| (*id, Vec::new())).collect();

        for (id, handle) in &self.analyzers {
            for req in handle.read().required_analyzers() {
                if !self.analyzers.contains_key(req) {
                    return Err(MetrikError::missing_analyzer(id.name(), req.name()));
                }
                dependents[req].push(*id);
                indegree[id] += 1;
            }
        }

        let mut ready: Vec<AnalyzerId> = ids
            .iter()
            .copied()
            .filter(|id| indegree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(ids.len());
        let mut cursor = 0;
        while cursor < ready.len() {
            let id = ready[cursor];
            cursor += 1;
            order.push(id);
            for dependent in &dependents[&id] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(*dependent);
                }
            }
        }

        if order.len() != ids.len() {
            return Err(MetrikError::internal(
                "analyzer requirements form a cycle",
            ));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::cyclomatic::CyclomaticComplexityAnalyzer;
    use crate::analyzers::halstead::HalsteadAnalyzer;
    use crate::analyzers::maintainability::MaintainabilityIndexAnalyzer;
    use crate::analyzers::node_count::NodeCountAnalyzer;
    use crate::analyzers::node_loc::NodeLocAnalyzer;

    fn sample_project() -> Project {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        project.add_function(ns, "run");
        project
    }

    #[test]
    fn test_run_orders_dependents_after_requirements() {
        let mut session = AnalysisSession::new();
        // register the dependent first; the session must reorder
        session.register(MaintainabilityIndexAnalyzer::new());
        session.register(HalsteadAnalyzer::new());
        session.register(CyclomaticComplexityAnalyzer::new());
        session.register(NodeLocAnalyzer::new());

        let order = session.resolve_order().unwrap();
        let position = |id: AnalyzerId| order.iter().position(|o| *o == id).unwrap();
        assert!(position(AnalyzerId::Halstead) < position(AnalyzerId::MaintainabilityIndex));
        assert!(
            position(AnalyzerId::CyclomaticComplexity)
                < position(AnalyzerId::MaintainabilityIndex)
        );
        assert!(position(AnalyzerId::NodeLoc) < position(AnalyzerId::MaintainabilityIndex));

        session.run(&sample_project()).unwrap();
    }

    #[test]
    fn test_missing_requirement_fails_before_analysis() {
        let mut session = AnalysisSession::new();
        session.register(MaintainabilityIndexAnalyzer::new());
        let err = session.run(&sample_project()).unwrap_err();
        assert!(matches!(err, MetrikError::MissingAnalyzer { .. }));
    }

    #[test]
    fn test_unregistered_analyzer_yields_empty_metrics() {
        let session = AnalysisSession::new();
        let metrics = session.node_metrics(
            AnalyzerId::CodeRank,
            NodeId::Namespace(crate::model::NamespaceId(0)),
        );
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_registration_replaces_prior_instance() {
        let mut session = AnalysisSession::new();
        let first = session.register(NodeCountAnalyzer::new());
        let second = session.register(NodeCountAnalyzer::new());
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(
            &second,
            &session.handle(AnalyzerId::NodeCount).unwrap()
        ));
    }
}
