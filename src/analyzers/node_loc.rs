//! Lines-of-code analyzer.
//!
//! Computes `loc` (physical lines), `cloc` (comment lines), `eloc`
//! (executable lines), `lloc` (logical lines), and `ncloc` (non-comment
//! lines) per compilation unit, per type, and per callable. In this model a
//! callable's executable and logical line counts are both the number of
//! statements in its body, since statements carry no individual spans.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::io::cache::{AnalysisCache, CacheDriver};
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::stmt::{Block, ElseBranch, Stmt};
use crate::model::visitor::{walk_project, walk_type, AstVisitor};
use crate::model::{CallableId, NodeId, Project, TypeId, UnitId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct LocBasis {
    loc: i64,
    cloc: i64,
    eloc: i64,
    lloc: i64,
    ncloc: i64,
}

impl LocBasis {
    fn to_metrics(self) -> MetricSet {
        MetricSet::new()
            .with_int("loc", self.loc)
            .with_int("cloc", self.cloc)
            .with_int("eloc", self.eloc)
            .with_int("lloc", self.lloc)
            .with_int("ncloc", self.ncloc)
    }
}

/// Per-node lines-of-code accounting, cached per compilation unit and per
/// callable.
pub struct NodeLocAnalyzer {
    nodes: IndexMap<NodeId, LocBasis>,
    cache: AnalysisCache,
}

impl Default for NodeLocAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeLocAnalyzer {
    /// Create the analyzer with an unbacked cache.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            cache: AnalysisCache::new(AnalyzerId::NodeLoc),
        }
    }

    fn unit_basis(&self, project: &Project, unit: UnitId) -> LocBasis {
        let def = project.unit(unit);
        let loc = def.line_count as i64;
        let cloc: i64 = def
            .comments
            .iter()
            .map(|span| span.line_count() as i64)
            .sum();
        let statements: i64 = project
            .callables()
            .filter(|c| c.unit == Some(unit))
            .map(|c| c.body.as_ref().map_or(0, count_block) as i64)
            .sum();
        LocBasis {
            loc,
            cloc,
            eloc: statements,
            lloc: statements,
            ncloc: loc - cloc,
        }
    }

    fn callable_basis(&self, project: &Project, id: CallableId) -> LocBasis {
        let callable = project.callable(id);
        let loc = callable.span.line_count() as i64;
        let cloc = callable
            .unit
            .map(|unit| {
                project
                    .unit(unit)
                    .comments
                    .iter()
                    .map(|comment| comment.overlap(&callable.span) as i64)
                    .sum()
            })
            .unwrap_or(0);
        let statements = callable.body.as_ref().map_or(0, count_block) as i64;
        LocBasis {
            loc,
            cloc,
            eloc: statements,
            lloc: statements,
            ncloc: loc - cloc,
        }
    }
}

impl AstVisitor for NodeLocAnalyzer {
    fn visit_class(&mut self, project: &Project, id: TypeId) {
        self.record_type(project, id);
        walk_type(self, project, id);
    }

    fn visit_interface(&mut self, project: &Project, id: TypeId) {
        self.record_type(project, id);
        walk_type(self, project, id);
    }

    fn visit_trait(&mut self, project: &Project, id: TypeId) {
        self.record_type(project, id);
        walk_type(self, project, id);
    }

    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record_callable(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record_callable(project, id);
    }
}

impl NodeLocAnalyzer {
    fn record_type(&mut self, project: &Project, id: TypeId) {
        let def = project.type_def(id);
        if !def.user_defined {
            return;
        }
        let loc = def.span.line_count() as i64;
        let cloc = def
            .unit
            .map(|unit| {
                project
                    .unit(unit)
                    .comments
                    .iter()
                    .map(|comment| comment.overlap(&def.span) as i64)
                    .sum()
            })
            .unwrap_or(0);
        let statements: i64 = def
            .methods
            .iter()
            .map(|m| {
                project
                    .callable(*m)
                    .body
                    .as_ref()
                    .map_or(0, count_block) as i64
            })
            .sum();
        self.nodes.insert(
            NodeId::Type(id),
            LocBasis {
                loc,
                cloc,
                eloc: statements,
                lloc: statements,
                ncloc: loc - cloc,
            },
        );
    }

    fn record_callable(&mut self, project: &Project, id: CallableId) {
        // loc/cloc depend on the span and the unit's comments, not just
        // the body, so the plain content fingerprint would go stale
        let fingerprint = project.callable_layout_fingerprint(id);
        let node = NodeId::Callable(id);
        let basis = self
            .cache
            .get_or_compute(node, fingerprint, || self.callable_basis(project, id));
        self.nodes.insert(node, basis);
    }
}

impl MetricsAnalyzer for NodeLocAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::NodeLoc
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.nodes.clear();
        for unit in project.units() {
            // unnamed units are synthetic and carry no measurable source
            if unit.file_name.is_none() {
                continue;
            }
            let node = NodeId::Unit(unit.id);
            let fingerprint = project.unit_fingerprint(unit.id);
            let basis = self
                .cache
                .get_or_compute(node, fingerprint, || self.unit_basis(project, unit.id));
            self.nodes.insert(node, basis);
        }
        walk_project(self, project);
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        self.nodes
            .get(&node)
            .map(|basis| basis.to_metrics())
            .unwrap_or_default()
    }

    fn project_metrics(&self) -> MetricSet {
        let mut totals = LocBasis::default();
        for (node, basis) in &self.nodes {
            if matches!(node, NodeId::Unit(_)) {
                totals.loc += basis.loc;
                totals.cloc += basis.cloc;
                totals.eloc += basis.eloc;
                totals.lloc += basis.lloc;
                totals.ncloc += basis.ncloc;
            }
        }
        totals.to_metrics()
    }

    fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache.set_driver(driver);
    }
}

fn count_block(block: &Block) -> usize {
    block.statements.iter().map(count_stmt).sum()
}

fn count_stmt(stmt: &Stmt) -> usize {
    1 + match stmt {
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            count_block(then_branch)
                + match else_branch {
                    Some(ElseBranch::Else(block)) => count_block(block),
                    Some(ElseBranch::ElseIf(stmt)) => count_stmt(stmt),
                    None => 0,
                }
        }
        Stmt::Switch { cases, .. } => cases.iter().map(|c| count_block(&c.body)).sum(),
        Stmt::While { body, .. }
        | Stmt::DoWhile { body, .. }
        | Stmt::For { body, .. }
        | Stmt::Foreach { body, .. } => count_block(body),
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            count_block(body)
                + catches.iter().map(|c| count_block(&c.body)).sum::<usize>()
                + finally.as_ref().map_or(0, count_block)
        }
        Stmt::Scope(block) => count_block(block),
        _ => 0,
    }
}
