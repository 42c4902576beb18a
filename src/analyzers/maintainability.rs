//! Maintainability index analyzer.
//!
//! Combines Halstead volume, cyclomatic complexity, and lines-of-code
//! accounting from its three prerequisite analyzers into the classical
//! maintainability index, clamped to the 0..100 range.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::errors::{MetrikError, Result};
use crate::io::cache::{AnalysisCache, CacheDriver};
use crate::metrics::{AnalyzerHandle, AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::visitor::{walk_project, AstVisitor};
use crate::model::{CallableId, NodeId, Project};

const REQUIRED: [AnalyzerId; 3] = [
    AnalyzerId::Halstead,
    AnalyzerId::CyclomaticComplexity,
    AnalyzerId::NodeLoc,
];

/// Per-callable `mi`, derived from injected Halstead, cyclomatic, and
/// lines-of-code results. The comment-density sine term is omitted when a
/// callable has no comment lines, and logarithm terms are omitted for
/// non-positive inputs.
pub struct MaintainabilityIndexAnalyzer {
    callables: IndexMap<CallableId, f64>,
    halstead: Option<AnalyzerHandle>,
    cyclomatic: Option<AnalyzerHandle>,
    node_loc: Option<AnalyzerHandle>,
    cache: AnalysisCache,
}

impl Default for MaintainabilityIndexAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MaintainabilityIndexAnalyzer {
    /// Create the analyzer; prerequisites are injected via `add_analyzer`.
    pub fn new() -> Self {
        Self {
            callables: IndexMap::new(),
            halstead: None,
            cyclomatic: None,
            node_loc: None,
            cache: AnalysisCache::new(AnalyzerId::MaintainabilityIndex),
        }
    }

    fn compute(&self, id: CallableId) -> Option<f64> {
        let node = NodeId::Callable(id);
        let halstead = self.halstead.as_ref()?.read().node_metrics(node);
        let cyclomatic = self.cyclomatic.as_ref()?.read().node_metrics(node);
        let loc_metrics = self.node_loc.as_ref()?.read().node_metrics(node);

        let hv = halstead.get_f64("hv")?;
        let ccn = cyclomatic.get_f64("ccn")?;
        let eloc = loc_metrics.get_f64("eloc")?;
        let loc = loc_metrics.get_f64("loc")?;
        let cloc = loc_metrics.get_f64("cloc")?;

        let mut mi = 171.0;
        if hv > 0.0 {
            mi -= 5.2 * hv.ln();
        }
        mi -= 0.23 * ccn;
        if eloc > 0.0 {
            mi -= 16.2 * eloc.ln();
        }
        if cloc > 0.0 && loc > 0.0 {
            let comment_ratio = cloc / loc;
            mi += 50.0 * (2.4 * comment_ratio).sqrt().sin();
        }
        Some(mi.clamp(0.0, 100.0))
    }

    fn record(&mut self, project: &Project, id: CallableId) {
        if !project.callable(id).has_body() {
            return;
        }
        let Some(mi) = self.compute(id) else {
            return;
        };
        // every input (hv, ccn, eloc, loc, cloc) derives from the body,
        // span, or unit comments, all of which the layout fingerprint covers
        let fingerprint = project.callable_layout_fingerprint(id);
        let cached = self
            .cache
            .get_or_compute(NodeId::Callable(id), fingerprint, || mi);
        self.callables.insert(id, cached);
    }
}

impl AstVisitor for MaintainabilityIndexAnalyzer {
    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }
}

impl MetricsAnalyzer for MaintainabilityIndexAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::MaintainabilityIndex
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        for (requirement, supplied) in [
            (AnalyzerId::Halstead, self.halstead.is_some()),
            (AnalyzerId::CyclomaticComplexity, self.cyclomatic.is_some()),
            (AnalyzerId::NodeLoc, self.node_loc.is_some()),
        ] {
            if !supplied {
                return Err(MetrikError::missing_analyzer(
                    self.id().name(),
                    requirement.name(),
                ));
            }
        }
        self.callables.clear();
        walk_project(self, project);
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        let NodeId::Callable(id) = node else {
            return MetricSet::new();
        };
        self.callables
            .get(&id)
            .map(|mi| MetricSet::new().with_float("mi", *mi))
            .unwrap_or_default()
    }

    fn required_analyzers(&self) -> &[AnalyzerId] {
        &REQUIRED
    }

    fn add_analyzer(&mut self, analyzer: AnalyzerHandle) -> Result<()> {
        let id = analyzer.read().id();
        match id {
            AnalyzerId::Halstead => self.halstead = Some(analyzer),
            AnalyzerId::CyclomaticComplexity => self.cyclomatic = Some(analyzer),
            AnalyzerId::NodeLoc => self.node_loc = Some(analyzer),
            other => {
                return Err(MetrikError::invalid_argument(format!(
                    "analyzer '{}' does not accept '{}'",
                    self.id(),
                    other
                )))
            }
        }
        Ok(())
    }

    fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache.set_driver(driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::cyclomatic::CyclomaticComplexityAnalyzer;
    use crate::analyzers::halstead::HalsteadAnalyzer;
    use crate::analyzers::node_loc::NodeLocAnalyzer;
    use crate::model::stmt::{Block, Expr, Stmt};
    use crate::model::SourceSpan;
    use approx::assert_relative_eq;
    use parking_lot::RwLock;
    use std::path::PathBuf;

    fn wired(project: &Project) -> MaintainabilityIndexAnalyzer {
        let mut halstead = HalsteadAnalyzer::new();
        halstead.analyze(project).unwrap();
        let mut cyclomatic = CyclomaticComplexityAnalyzer::new();
        cyclomatic.analyze(project).unwrap();
        let mut node_loc = NodeLocAnalyzer::new();
        node_loc.analyze(project).unwrap();

        let mut analyzer = MaintainabilityIndexAnalyzer::new();
        analyzer
            .add_analyzer(Arc::new(RwLock::new(halstead)))
            .unwrap();
        analyzer
            .add_analyzer(Arc::new(RwLock::new(cyclomatic)))
            .unwrap();
        analyzer
            .add_analyzer(Arc::new(RwLock::new(node_loc)))
            .unwrap();
        analyzer
    }

    fn sample_project() -> (Project, CallableId) {
        let mut project = Project::new();
        let unit = project.add_unit(Some(PathBuf::from("src/calc.code")), 12);
        project.add_comment(unit, SourceSpan::new(2, 3));
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "calc");
        project.set_callable_location(f, unit, SourceSpan::new(1, 10));
        project.set_body(
            f,
            Block::new(vec![
                Stmt::Expr(Expr::assign_var(
                    "sum",
                    Expr::binary(
                        crate::model::stmt::BinaryOp::Add,
                        Expr::var("a"),
                        Expr::var("b"),
                    ),
                )),
                Stmt::Return(Some(Expr::var("sum"))),
            ]),
        );
        (project, f)
    }

    #[test]
    fn test_default_construction() {
        assert_eq!(
            MaintainabilityIndexAnalyzer::default().id(),
            AnalyzerId::MaintainabilityIndex
        );
    }

    #[test]
    fn test_requires_all_three_inputs() {
        let (project, _) = sample_project();
        let mut analyzer = MaintainabilityIndexAnalyzer::new();
        let err = analyzer.analyze(&project).unwrap_err();
        assert!(matches!(err, MetrikError::MissingAnalyzer { .. }));
        assert_eq!(analyzer.required_analyzers().len(), 3);
    }

    #[test]
    fn test_rejects_unrelated_analyzer() {
        let mut analyzer = MaintainabilityIndexAnalyzer::new();
        let other: AnalyzerHandle = Arc::new(RwLock::new(NodeLocAnalyzer::new()));
        analyzer.add_analyzer(other).unwrap();

        let wrong: AnalyzerHandle =
            Arc::new(RwLock::new(crate::analyzers::hierarchy::HierarchyAnalyzer::new()));
        let err = analyzer.add_analyzer(wrong).unwrap_err();
        assert!(matches!(err, MetrikError::InvalidArgument { .. }));
    }

    #[test]
    fn test_index_matches_formula() {
        let (project, f) = sample_project();
        let mut analyzer = wired(&project);
        analyzer.analyze(&project).unwrap();

        // hv from {=, +, return} / {sum, a, b, sum}: N=7, n=6
        let hv = 7.0 * 6.0f64.log2();
        let expected = 171.0 - 5.2 * hv.ln() - 0.23 * 1.0 - 16.2 * 2.0f64.ln()
            + 50.0 * (2.4f64 * (2.0 / 10.0)).sqrt().sin();
        let mi = analyzer
            .node_metrics(NodeId::Callable(f))
            .get_f64("mi")
            .unwrap();
        assert_relative_eq!(mi, expected.clamp(0.0, 100.0), max_relative = 1e-12);
    }

    #[test]
    fn test_new_comments_invalidate_warm_cache() {
        use crate::io::cache::{CacheDriver, MemoryCacheDriver};

        // large enough that the index sits below the clamp either way
        let mut project = Project::new();
        let unit = project.add_unit(Some(PathBuf::from("src/batch.code")), 50);
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "accumulate");
        project.set_callable_location(f, unit, SourceSpan::new(1, 40));
        let statements = (0..30)
            .map(|_| {
                Stmt::Expr(Expr::assign_var(
                    "sum",
                    Expr::binary(
                        crate::model::stmt::BinaryOp::Add,
                        Expr::var("sum"),
                        Expr::var("a"),
                    ),
                ))
            })
            .collect();
        project.set_body(f, Block::new(statements));

        let driver: Arc<dyn CacheDriver> = Arc::new(MemoryCacheDriver::new());
        let mut warm = wired(&project);
        warm.set_cache(Arc::clone(&driver));
        warm.analyze(&project).unwrap();
        let before = warm
            .node_metrics(NodeId::Callable(f))
            .get_f64("mi")
            .unwrap();

        // a comment line inside the span adds the density term, same body
        project.add_comment(unit, SourceSpan::new(2, 2));
        let mut fresh = wired(&project);
        fresh.set_cache(driver);
        fresh.analyze(&project).unwrap();
        let after = fresh
            .node_metrics(NodeId::Callable(f))
            .get_f64("mi")
            .unwrap();

        assert!(before < 100.0 && after < 100.0);
        assert!(after > before);
    }

    #[test]
    fn test_trivial_callable_reports_full_score() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "noop");

        let mut analyzer = wired(&project);
        analyzer.analyze(&project).unwrap();
        let mi = analyzer
            .node_metrics(NodeId::Callable(f))
            .get_f64("mi")
            .unwrap();
        assert_eq!(mi, 100.0);
    }

    #[test]
    fn test_unknown_node_is_empty() {
        let (project, _) = sample_project();
        let mut analyzer = wired(&project);
        analyzer.analyze(&project).unwrap();
        assert!(analyzer
            .node_metrics(NodeId::Callable(CallableId(42)))
            .is_empty());
    }
}
