//! CRAP index analyzer: change risk anti-patterns.
//!
//! `crap = ccn2^2 * (1 - coverage)^3 + ccn2`, combining the extended
//! cyclomatic complexity of a callable with its test coverage from a
//! Clover report. Without a configured report the analyzer is disabled and
//! every metric query returns an empty set.

use indexmap::IndexMap;

use crate::core::errors::{MetrikError, Result};
use crate::io::coverage::CloverReport;
use crate::metrics::{AnalyzerHandle, AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::visitor::{walk_project, AstVisitor};
use crate::model::{CallableId, NodeId, Project};

const REQUIRED: [AnalyzerId; 1] = [AnalyzerId::CyclomaticComplexity];

/// Per-callable `crap`, fed by the cyclomatic complexity analyzer and a
/// Clover coverage report. Abstract and interface methods are skipped
/// regardless of coverage.
#[derive(Default)]
pub struct CrapIndexAnalyzer {
    callables: IndexMap<CallableId, f64>,
    cyclomatic: Option<AnalyzerHandle>,
    report: Option<CloverReport>,
}

impl CrapIndexAnalyzer {
    /// Create a disabled analyzer (no coverage report configured).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an enabled analyzer backed by a parsed coverage report.
    pub fn with_report(report: CloverReport) -> Self {
        Self {
            callables: IndexMap::new(),
            cyclomatic: None,
            report: Some(report),
        }
    }

    /// Whether a coverage report is configured. A disabled analyzer never
    /// computes and never errors.
    pub fn is_enabled(&self) -> bool {
        self.report.is_some()
    }

    fn coverage_for(&self, project: &Project, id: CallableId) -> f64 {
        let Some(report) = &self.report else {
            return 0.0;
        };
        let callable = project.callable(id);
        let file = callable
            .unit
            .and_then(|unit| project.unit(unit).file_name.clone());
        match file {
            Some(file) => report.coverage_for_span(&file, callable.span),
            None => 0.0,
        }
    }

    fn record(&mut self, project: &Project, id: CallableId) {
        if !project.callable(id).has_body() {
            return;
        }
        let node = NodeId::Callable(id);
        let Some(cyclomatic) = &self.cyclomatic else {
            return;
        };
        let Some(ccn2) = cyclomatic.read().node_metrics(node).get_f64("ccn2") else {
            return;
        };
        let coverage = self.coverage_for(project, id);
        let crap = ccn2.powi(2) * (1.0 - coverage).powi(3) + ccn2;
        self.callables.insert(id, crap);
    }
}

impl AstVisitor for CrapIndexAnalyzer {
    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }
}

impl MetricsAnalyzer for CrapIndexAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Crap
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.callables.clear();
        // disabled is a configuration state, not an error
        if !self.is_enabled() {
            return Ok(());
        }
        if self.cyclomatic.is_none() {
            return Err(MetrikError::missing_analyzer(
                self.id().name(),
                AnalyzerId::CyclomaticComplexity.name(),
            ));
        }
        walk_project(self, project);
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        let NodeId::Callable(id) = node else {
            return MetricSet::new();
        };
        self.callables
            .get(&id)
            .map(|crap| MetricSet::new().with_float("crap", *crap))
            .unwrap_or_default()
    }

    fn required_analyzers(&self) -> &[AnalyzerId] {
        // a disabled analyzer must not drag its dependency into a session
        if self.is_enabled() {
            &REQUIRED
        } else {
            &[]
        }
    }

    fn add_analyzer(&mut self, analyzer: AnalyzerHandle) -> Result<()> {
        let id = analyzer.read().id();
        if id == AnalyzerId::CyclomaticComplexity {
            self.cyclomatic = Some(analyzer);
            Ok(())
        } else {
            Err(MetrikError::invalid_argument(format!(
                "analyzer '{}' does not accept '{}'",
                self.id(),
                id
            )))
        }
    }
}
