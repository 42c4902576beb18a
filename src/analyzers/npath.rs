//! NPath complexity analyzer.
//!
//! Counts acyclic execution paths through a callable's control flow.
//! Sequential statements multiply, branches add, and boolean operators in
//! a controlling condition contribute additional paths. An empty body has
//! exactly one path.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::errors::Result;
use crate::io::cache::{AnalysisCache, CacheDriver};
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::stmt::{Block, ElseBranch, Expr, Stmt};
use crate::model::visitor::{walk_project, AstVisitor};
use crate::model::{CallableId, NodeId, Project};

/// Per-callable `npath`, cached by content fingerprint.
pub struct NPathComplexityAnalyzer {
    callables: IndexMap<CallableId, u64>,
    cache: AnalysisCache,
}

impl Default for NPathComplexityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl NPathComplexityAnalyzer {
    /// Create the analyzer with an unbacked cache.
    pub fn new() -> Self {
        Self {
            callables: IndexMap::new(),
            cache: AnalysisCache::new(AnalyzerId::NPathComplexity),
        }
    }

    fn record(&mut self, project: &Project, id: CallableId) {
        let Some(body) = &project.callable(id).body else {
            return;
        };
        let fingerprint = project.callable_fingerprint(id);
        let npath = self
            .cache
            .get_or_compute(NodeId::Callable(id), fingerprint, || block_np(body));
        self.callables.insert(id, npath);
    }
}

impl AstVisitor for NPathComplexityAnalyzer {
    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }
}

impl MetricsAnalyzer for NPathComplexityAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::NPathComplexity
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
            .map(|npath| MetricSet::new().with_int("npath", *npath as i64))
            .unwrap_or_default()
    }

    fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache.set_driver(driver);
    }
}

/// Paths through a block: the product over its statements.
fn block_np(block: &Block) -> u64 {
    block
        .statements
        .iter()
        .map(stmt_np)
        .fold(1u64, u64::saturating_mul)
}

fn stmt_np(stmt: &Stmt) -> u64 {
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Return(Some(e)) => expr_np(e),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => 1,
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let else_np = match else_branch {
                Some(ElseBranch::Else(block)) => block_np(block),
                Some(ElseBranch::ElseIf(stmt)) => stmt_np(stmt),
                None => 1,
            };
            bool_ops(condition) + block_np(then_branch) + else_np
        }
        Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
            block_np(body) + bool_ops(condition) + 1
        }
        Stmt::For {
            condition, body, ..
        } => block_np(body) + condition.as_ref().map_or(0, bool_ops) + 1,
        Stmt::Foreach { subject, body } => block_np(body) + bool_ops(subject) + 1,
        Stmt::Switch { subject, cases } => {
            let sole_case = cases.len() == 1;
            let sum: u64 = cases
                .iter()
                .filter(|case| !case.is_default || sole_case)
                .map(|case| block_np(&case.body))
                .sum();
            (bool_ops(subject) + sum).max(1)
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            let catch_sum: u64 = catches.iter().map(|c| block_np(&c.body)).sum();
            let base = block_np(body).saturating_mul(catch_sum.max(1));
            match finally {
                Some(block) => base.saturating_mul(block_np(block)),
                None => base,
            }
        }
        Stmt::Scope(block) => block_np(block),
    }
}

/// Paths through an expression: ternaries add their arms, everything else
/// contributes a single path.
fn expr_np(expr: &Expr) -> u64 {
    match expr {
        Expr::Ternary {
            then_branch,
            else_branch,
            ..
        } => then_branch.as_deref().map_or(1, expr_np) + expr_np(else_branch),
        Expr::Binary { left, right, .. } => expr_np(left).saturating_mul(expr_np(right)),
        Expr::Unary { operand, .. } => expr_np(operand),
        Expr::Assign { target, value } => expr_np(target).saturating_mul(expr_np(value)),
        _ => 1,
    }
}

/// Boolean operator occurrences within a condition expression.
fn bool_ops(expr: &Expr) -> u64 {
    match expr {
        Expr::Binary { op, left, right } => {
            u64::from(op.is_boolean()) + bool_ops(left) + bool_ops(right)
        }
        Expr::Unary { operand, .. } => bool_ops(operand),
        Expr::Assign { target, value } => bool_ops(target) + bool_ops(value),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            bool_ops(condition)
                + then_branch.as_deref().map_or(0, bool_ops)
                + bool_ops(else_branch)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cache::MemoryCacheDriver;
    use crate::model::stmt::SwitchCase;

    fn analyzed(body: Block) -> i64 {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "subject");
        project.set_body(f, body);

        let mut analyzer = NPathComplexityAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        analyzer
            .node_metrics(NodeId::Callable(f))
            .get_int("npath")
            .unwrap()
    }

    fn simple_if() -> Stmt {
        Stmt::If {
            condition: Expr::var("a"),
            then_branch: Block::empty(),
            else_branch: None,
        }
    }

    #[test]
    fn test_default_construction() {
        assert_eq!(
            NPathComplexityAnalyzer::default().id(),
            AnalyzerId::NPathComplexity
        );
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(analyzed(Block::empty()), 1);
    }

    #[test]
    fn test_single_if() {
        assert_eq!(analyzed(Block::new(vec![simple_if()])), 2);
    }

    #[test]
    fn test_sequential_ifs_multiply() {
        assert_eq!(analyzed(Block::new(vec![simple_if(), simple_if()])), 4);
    }

    #[test]
    fn test_nested_if_sums_inner_paths() {
        let outer = Stmt::If {
            condition: Expr::var("a"),
            then_branch: Block::new(vec![simple_if()]),
            else_branch: None,
        };
        // then-branch paths (2) + implicit else (1), scope transparent
        let body = Block::new(vec![Stmt::Scope(Block::new(vec![outer]))]);
        assert_eq!(analyzed(body), 3);
    }

    #[test]
    fn test_switch_sums_case_paths() {
        let switch = Stmt::Switch {
            subject: Expr::var("mode"),
            cases: (0..5).map(|_| SwitchCase::labeled(Block::empty())).collect(),
        };
        assert_eq!(analyzed(Block::new(vec![switch])), 5);
    }

    #[test]
    fn test_default_case_excluded_unless_sole() {
        let with_default = Stmt::Switch {
            subject: Expr::var("mode"),
            cases: vec![
                SwitchCase::labeled(Block::empty()),
                SwitchCase::labeled(Block::empty()),
                SwitchCase::default_case(Block::empty()),
            ],
        };
        assert_eq!(analyzed(Block::new(vec![with_default])), 2);

        let only_default = Stmt::Switch {
            subject: Expr::var("mode"),
            cases: vec![SwitchCase::default_case(Block::empty())],
        };
        assert_eq!(analyzed(Block::new(vec![only_default])), 1);
    }

    #[test]
    fn test_boolean_condition_adds_paths() {
        let stmt = Stmt::If {
            condition: Expr::and(Expr::var("a"), Expr::var("b")),
            then_branch: Block::empty(),
            else_branch: None,
        };
        assert_eq!(analyzed(Block::new(vec![stmt])), 3);
    }

    #[test]
    fn test_loop_paths() {
        let stmt = Stmt::While {
            condition: Expr::var("running"),
            body: Block::new(vec![simple_if()]),
        };
        // body paths (2) + condition ops (0) + skip (1)
        assert_eq!(analyzed(Block::new(vec![stmt])), 3);
    }

    #[test]
    fn test_try_multiplies_catch_sum() {
        let stmt = Stmt::Try {
            body: Block::new(vec![simple_if()]),
            catches: vec![
                crate::model::stmt::CatchClause {
                    exception: None,
                    body: Block::new(vec![simple_if()]),
                },
                crate::model::stmt::CatchClause {
                    exception: None,
                    body: Block::empty(),
                },
            ],
            finally: None,
        };
        // try (2) * (catch 2 + catch 1)
        assert_eq!(analyzed(Block::new(vec![stmt])), 6);
    }

    #[test]
    fn test_scope_is_transparent() {
        let stmt = Stmt::Scope(Block::new(vec![simple_if(), simple_if()]));
        assert_eq!(analyzed(Block::new(vec![stmt])), 4);
    }

    #[test]
    fn test_cache_round_trip_is_exact() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "subject");
        project.set_body(f, Block::new(vec![simple_if(), simple_if()]));

        let driver: Arc<dyn CacheDriver> = Arc::new(MemoryCacheDriver::new());
        let mut warm = NPathComplexityAnalyzer::new();
        warm.set_cache(Arc::clone(&driver));
        warm.analyze(&project).unwrap();

        let mut restored = NPathComplexityAnalyzer::new();
        restored.set_cache(driver);
        restored.analyze(&project).unwrap();

        assert_eq!(
            warm.node_metrics(NodeId::Callable(f)),
            restored.node_metrics(NodeId::Callable(f))
        );
    }
}
