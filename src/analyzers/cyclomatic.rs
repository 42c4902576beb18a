//! Cyclomatic complexity analyzer.
//!
//! `ccn` is one plus the number of decision points in a callable's body:
//! `if`/`elseif` branches, ternaries, non-default `switch` cases, loop
//! conditions, and `catch` clauses. `ccn2` additionally counts every
//! short-circuit boolean operator occurrence, so `ccn2 >= ccn` with
//! equality exactly when no compound boolean expressions are present.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::io::cache::{AnalysisCache, CacheDriver};
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::stmt::{Block, ElseBranch, Expr, Stmt};
use crate::model::visitor::{walk_project, AstVisitor};
use crate::model::{CallableId, NodeId, Project};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct CyclomaticBasis {
    ccn: i64,
    ccn2: i64,
}

/// Per-callable `ccn`/`ccn2` with project-wide sums, cached by content
/// fingerprint. Bodyless callables (abstract and interface methods) carry
/// no metrics.
pub struct CyclomaticComplexityAnalyzer {
    callables: IndexMap<CallableId, CyclomaticBasis>,
    cache: AnalysisCache,
}

impl Default for CyclomaticComplexityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CyclomaticComplexityAnalyzer {
    /// Create the analyzer with an unbacked cache.
    pub fn new() -> Self {
        Self {
            callables: IndexMap::new(),
            cache: AnalysisCache::new(AnalyzerId::CyclomaticComplexity),
        }
    }

    fn record(&mut self, project: &Project, id: CallableId) {
        let Some(body) = &project.callable(id).body else {
            return;
        };
        let fingerprint = project.callable_fingerprint(id);
        let basis = self
            .cache
            .get_or_compute(NodeId::Callable(id), fingerprint, || {
                let mut counts = Counts::default();
                counts.block(body);
                CyclomaticBasis {
                    ccn: 1 + counts.decisions,
                    ccn2: 1 + counts.decisions + counts.bool_ops,
                }
            });
        self.callables.insert(id, basis);
    }
}

impl AstVisitor for CyclomaticComplexityAnalyzer {
    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }
}

impl MetricsAnalyzer for CyclomaticComplexityAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::CyclomaticComplexity
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
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
            .map(|basis| {
                MetricSet::new()
                    .with_int("ccn", basis.ccn)
                    .with_int("ccn2", basis.ccn2)
            })
            .unwrap_or_default()
    }

    fn project_metrics(&self) -> MetricSet {
        let ccn: i64 = self.callables.values().map(|b| b.ccn).sum();
        let ccn2: i64 = self.callables.values().map(|b| b.ccn2).sum();
        MetricSet::new().with_int("ccn", ccn).with_int("ccn2", ccn2)
    }

    fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache.set_driver(driver);
    }
}

#[derive(Default)]
struct Counts {
    decisions: i64,
    bool_ops: i64,
}

impl Counts {
    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Return(Some(e)) => self.expr(e),
            Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.decisions += 1;
                self.expr(condition);
                self.block(then_branch);
                match else_branch {
                    Some(ElseBranch::Else(block)) => self.block(block),
                    Some(ElseBranch::ElseIf(stmt)) => self.stmt(stmt),
                    None => {}
                }
            }
            Stmt::Switch { subject, cases } => {
                self.expr(subject);
                for case in cases {
                    if !case.is_default {
                        self.decisions += 1;
                    }
                    self.block(&case.body);
                }
            }
            Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
                self.decisions += 1;
                self.expr(condition);
                self.block(body);
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                self.decisions += 1;
                for expr in [init, condition, update].into_iter().flatten() {
                    self.expr(expr);
                }
                self.block(body);
            }
            Stmt::Foreach { subject, body } => {
                self.decisions += 1;
                self.expr(subject);
                self.block(body);
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.block(body);
                for catch in catches {
                    self.decisions += 1;
                    self.block(&catch.body);
                }
                if let Some(block) = finally {
                    self.block(block);
                }
            }
            Stmt::Scope(block) => self.block(block),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable(_) | Expr::Literal(_) | Expr::ClassRef(_) => {}
            Expr::Binary { op, left, right } => {
                if op.is_boolean() {
                    self.bool_ops += 1;
                }
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Assign { target, value } => {
                self.expr(target);
                self.expr(value);
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.decisions += 1;
                self.expr(condition);
                if let Some(e) = then_branch {
                    self.expr(e);
                }
                self.expr(else_branch);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| self.expr(a)),
            Expr::MethodCall { receiver, args, .. } => {
                self.expr(receiver);
                args.iter().for_each(|a| self.expr(a));
            }
            Expr::StaticCall { args, .. } | Expr::New { args, .. } => {
                args.iter().for_each(|a| self.expr(a));
            }
            Expr::PropertyFetch { receiver, .. } => self.expr(receiver),
            Expr::InstanceOf { expr, .. } => self.expr(expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cache::MemoryCacheDriver;
    use crate::model::stmt::{CatchClause, SwitchCase};
    use crate::model::NamespaceId;

    /// Four decision points, one boolean operator.
    fn first_body() -> Block {
        Block::new(vec![
            Stmt::If {
                condition: Expr::and(Expr::var("a"), Expr::var("b")),
                then_branch: Block::empty(),
                else_branch: None,
            },
            Stmt::For {
                init: None,
                condition: Some(Expr::var("i")),
                update: None,
                body: Block::empty(),
            },
            Stmt::While {
                condition: Expr::var("running"),
                body: Block::empty(),
            },
            Stmt::Try {
                body: Block::empty(),
                catches: vec![CatchClause {
                    exception: None,
                    body: Block::empty(),
                }],
                finally: None,
            },
        ])
    }

    /// Six decision points, three boolean operators.
    fn second_body() -> Block {
        Block::new(vec![
            Stmt::If {
                condition: Expr::or(Expr::var("a"), Expr::var("b")),
                then_branch: Block::empty(),
                else_branch: Some(ElseBranch::ElseIf(Box::new(Stmt::If {
                    condition: Expr::and(Expr::var("c"), Expr::var("d")),
                    then_branch: Block::empty(),
                    else_branch: None,
                }))),
            },
            Stmt::Expr(Expr::Ternary {
                condition: Box::new(Expr::binary(
                    crate::model::stmt::BinaryOp::LogicalOr,
                    Expr::var("x"),
                    Expr::var("y"),
                )),
                then_branch: Some(Box::new(Expr::int(1))),
                else_branch: Box::new(Expr::int(2)),
            }),
            Stmt::Switch {
                subject: Expr::var("mode"),
                cases: vec![
                    SwitchCase::labeled(Block::empty()),
                    SwitchCase::labeled(Block::empty()),
                    SwitchCase::labeled(Block::empty()),
                    SwitchCase::default_case(Block::empty()),
                ],
            },
        ])
    }

    fn fixture() -> (Project, CallableId, CallableId) {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let first = project.add_function(ns, "dispatch");
        project.set_body(first, first_body());
        let second = project.add_function(ns, "classify");
        project.set_body(second, second_body());
        (project, first, second)
    }

    #[test]
    fn test_reference_complexities() {
        let (project, first, second) = fixture();
        let mut analyzer = CyclomaticComplexityAnalyzer::new();
        analyzer.analyze(&project).unwrap();

        let m1 = analyzer.node_metrics(NodeId::Callable(first));
        assert_eq!(m1.get_int("ccn"), Some(5));
        assert_eq!(m1.get_int("ccn2"), Some(6));

        let m2 = analyzer.node_metrics(NodeId::Callable(second));
        assert_eq!(m2.get_int("ccn"), Some(7));
        assert_eq!(m2.get_int("ccn2"), Some(10));

        let totals = analyzer.project_metrics();
        assert_eq!(totals.get_int("ccn"), Some(12));
        assert_eq!(totals.get_int("ccn2"), Some(16));
    }

    #[test]
    fn test_default_construction() {
        assert_eq!(
            CyclomaticComplexityAnalyzer::default().id(),
            AnalyzerId::CyclomaticComplexity
        );
    }

    #[test]
    fn test_empty_body_is_one() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "noop");

        let mut analyzer = CyclomaticComplexityAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        let metrics = analyzer.node_metrics(NodeId::Callable(f));
        assert_eq!(metrics.get_int("ccn"), Some(1));
        assert_eq!(metrics.get_int("ccn2"), Some(1));
    }

    #[test]
    fn test_abstract_methods_carry_no_metrics() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let iface = project.add_interface(ns, "Runner");
        let m = project.add_method(iface, "run");

        let mut analyzer = CyclomaticComplexityAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        assert!(analyzer.node_metrics(NodeId::Callable(m)).is_empty());
    }

    #[test]
    fn test_unknown_node_is_empty() {
        let (project, _, _) = fixture();
        let mut analyzer = CyclomaticComplexityAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        assert!(analyzer
            .node_metrics(NodeId::Namespace(NamespaceId(0)))
            .is_empty());
    }

    #[test]
    fn test_idempotent_with_shared_cache() {
        let (project, first, _) = fixture();
        let driver: Arc<dyn CacheDriver> = Arc::new(MemoryCacheDriver::new());

        let mut warm = CyclomaticComplexityAnalyzer::new();
        warm.set_cache(Arc::clone(&driver));
        warm.analyze(&project).unwrap();

        let mut restored = CyclomaticComplexityAnalyzer::new();
        restored.set_cache(driver);
        restored.analyze(&project).unwrap();

        assert_eq!(
            warm.node_metrics(NodeId::Callable(first)),
            restored.node_metrics(NodeId::Callable(first))
        );
        assert_eq!(warm.project_metrics(), restored.project_metrics());
    }
}
