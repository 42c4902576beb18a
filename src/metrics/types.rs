//! Metric value types and the analyzer contract.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::errors::{MetrikError, Result};
use crate::io::cache::CacheDriver;
use crate::model::{NodeId, Project};

/// A single metric value, integer or floating point.
///
/// The distinction matters for the public contract: counting metrics are
/// exact integers, derived metrics are doubles, and cache round-trips must
/// preserve both bit-exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// An exact integer count
    Int(i64),
    /// A derived floating-point value
    Float(f64),
}

impl MetricValue {
    /// The value as an `f64` regardless of representation.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered mapping from metric short-name to value.
///
/// An empty set means "this analyzer computed nothing for that node", which
/// is distinct from a set containing zero values. Analyzers return an empty
/// set for nodes they never visited; they never error on unknown nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    values: IndexMap<String, MetricValue>,
}

impl MetricSet {
    /// Create an empty metric set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of metrics in the set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set contains no metrics.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Insert an integer metric.
    pub fn insert_int(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), MetricValue::Int(value));
    }

    /// Insert a floating-point metric.
    pub fn insert_float(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), MetricValue::Float(value));
    }

    /// Builder-style integer insert.
    pub fn with_int(mut self, name: impl Into<String>, value: i64) -> Self {
        self.insert_int(name, value);
        self
    }

    /// Builder-style float insert.
    pub fn with_float(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert_float(name, value);
        self
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    /// Look up a metric as `f64`.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).map(MetricValue::as_f64)
    }

    /// Look up an integer metric.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(MetricValue::as_int)
    }

    /// Iterate over metrics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Identity of each analyzer in the suite, used for dependency declaration
/// and cache segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzerId {
    /// Class/interface/method/function counts
    NodeCount,
    /// Lines-of-code accounting
    NodeLoc,
    /// Class hierarchy classification
    Hierarchy,
    /// Inheritance depth and override counts
    Inheritance,
    /// Namespace-level dependency ratios
    Dependency,
    /// Object coupling
    Coupling,
    /// Cyclomatic complexity
    CyclomaticComplexity,
    /// NPath complexity
    NPathComplexity,
    /// Halstead software-science metrics
    Halstead,
    /// Maintainability index
    MaintainabilityIndex,
    /// CRAP index
    Crap,
    /// Dependency-graph rank
    CodeRank,
}

impl AnalyzerId {
    /// The stable textual name, used in cache paths and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::NodeCount => "node-count",
            Self::NodeLoc => "node-loc",
            Self::Hierarchy => "hierarchy",
            Self::Inheritance => "inheritance",
            Self::Dependency => "dependency",
            Self::Coupling => "coupling",
            Self::CyclomaticComplexity => "cyclomatic-complexity",
            Self::NPathComplexity => "npath-complexity",
            Self::Halstead => "halstead",
            Self::MaintainabilityIndex => "maintainability-index",
            Self::Crap => "crap-index",
            Self::CodeRank => "code-rank",
        }
    }
}

impl fmt::Display for AnalyzerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A shared, lockable analyzer handle, used for dependency injection.
pub type AnalyzerHandle = Arc<RwLock<dyn MetricsAnalyzer>>;

/// The analyzer contract.
///
/// `analyze` traverses the project exactly once per node kind the analyzer
/// cares about; results are immutable snapshots afterwards, and a second
/// `analyze` call over the same project recomputes the identical values.
pub trait MetricsAnalyzer: Send + Sync {
    /// This analyzer's identity.
    fn id(&self) -> AnalyzerId;

    /// Run the analysis over the project.
    fn analyze(&mut self, project: &Project) -> Result<()>;

    /// Metrics recorded for a node; empty for nodes this analyzer never
    /// visited or does not support.
    fn node_metrics(&self, node: NodeId) -> MetricSet;

    /// Aggregate metrics for the whole analysis run; empty for purely
    /// per-node analyzers.
    fn project_metrics(&self) -> MetricSet {
        MetricSet::new()
    }

    /// Analyzer ids this analyzer requires as inputs.
    fn required_analyzers(&self) -> &[AnalyzerId] {
        &[]
    }

    /// Supply a required analyzer. The default rejects everything, matching
    /// analyzers that declare no requirements.
    fn add_analyzer(&mut self, analyzer: AnalyzerHandle) -> Result<()> {
        let other = analyzer.read().id();
        Err(MetrikError::invalid_argument(format!(
            "analyzer '{}' accepts no dependency, got '{}'",
            self.id(),
            other
        )))
    }

    /// Configure the backing metric cache. Analyzers that do not cache
    /// ignore the driver.
    fn set_cache(&mut self, _driver: Arc<dyn CacheDriver>) {}
}
