//! Halstead software-science analyzer.
//!
//! Classifies a callable's body into operator and operand tokens, then
//! derives the classical Halstead measures from the distinct/total counts.
//! Operators are unary/binary/assignment operators, control-flow keywords,
//! call sites, and member accesses; operands are variables, literals,
//! called names, and referenced type names. The derived metrics are
//! computed in a fixed order because the reference values are sensitive to
//! floating-point evaluation order.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::io::cache::{AnalysisCache, CacheDriver};
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::stmt::{Block, ElseBranch, Expr, Stmt};
use crate::model::visitor::{walk_project, AstVisitor};
use crate::model::{CallableId, NodeId, Project};

/// Distinct and total operator/operand counts for one callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HalsteadBasis {
    /// Distinct operators (`n1`)
    pub distinct_operators: u64,
    /// Distinct operands (`n2`)
    pub distinct_operands: u64,
    /// Total operator occurrences (`N1`)
    pub total_operators: u64,
    /// Total operand occurrences (`N2`)
    pub total_operands: u64,
}

impl HalsteadBasis {
    /// Derive the full metric set in the canonical order.
    fn to_metrics(self) -> MetricSet {
        let n1 = self.distinct_operators as f64;
        let n2 = self.distinct_operands as f64;
        let big_n1 = self.total_operators as f64;
        let big_n2 = self.total_operands as f64;

        let hnt = big_n1 + big_n2;
        let hnd = n1 + n2;
        let hv = if hnd > 0.0 { hnt * hnd.log2() } else { 0.0 };
        let hd = if n2 > 0.0 { (n1 / 2.0) * (big_n2 / n2) } else { 0.0 };
        let hl = if hd > 0.0 { 1.0 / hd } else { 0.0 };
        let he = hd * hv;
        let ht = he / 18.0;
        let hb = he.powf(2.0 / 3.0) / 3000.0;
        let hi = if hd > 0.0 { hv / hd } else { 0.0 };

        MetricSet::new()
            .with_int("n1", self.distinct_operators as i64)
            .with_int("n2", self.distinct_operands as i64)
            .with_int("N1", self.total_operators as i64)
            .with_int("N2", self.total_operands as i64)
            .with_float("hnt", hnt)
            .with_float("hnd", hnd)
            .with_float("hv", hv)
            .with_float("hd", hd)
            .with_float("hl", hl)
            .with_float("he", he)
            .with_float("ht", ht)
            .with_float("hb", hb)
            .with_float("hi", hi)
    }
}

/// Per-callable Halstead metrics, caching the raw basis so restored
/// derived values are bit-identical to freshly computed ones.
pub struct HalsteadAnalyzer {
    callables: IndexMap<CallableId, HalsteadBasis>,
    cache: AnalysisCache,
}

impl Default for HalsteadAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HalsteadAnalyzer {
    /// Create the analyzer with an unbacked cache.
    pub fn new() -> Self {
        Self {
            callables: IndexMap::new(),
            cache: AnalysisCache::new(AnalyzerId::Halstead),
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
                let mut tokens = TokenCounts::default();
                tokens.block(project, body);
                tokens.basis()
            });
        self.callables.insert(id, basis);
    }
}

impl AstVisitor for HalsteadAnalyzer {
    fn visit_method(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }

    fn visit_function(&mut self, project: &Project, id: CallableId) {
        self.record(project, id);
    }
}

impl MetricsAnalyzer for HalsteadAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Halstead
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
            .map(|basis| basis.to_metrics())
            .unwrap_or_default()
    }

    fn set_cache(&mut self, driver: Arc<dyn CacheDriver>) {
        self.cache.set_driver(driver);
    }
}

#[derive(Default)]
struct TokenCounts {
    operators: IndexMap<String, u64>,
    operands: IndexMap<String, u64>,
}

impl TokenCounts {
    fn operator(&mut self, token: &str) {
        *self.operators.entry(token.to_string()).or_insert(0) += 1;
    }

    fn operand(&mut self, token: &str) {
        *self.operands.entry(token.to_string()).or_insert(0) += 1;
    }

    fn basis(&self) -> HalsteadBasis {
        HalsteadBasis {
            distinct_operators: self.operators.len() as u64,
            distinct_operands: self.operands.len() as u64,
            total_operators: self.operators.values().sum(),
            total_operands: self.operands.values().sum(),
        }
    }

    fn block(&mut self, project: &Project, block: &Block) {
        for stmt in &block.statements {
            self.stmt(project, stmt);
        }
    }

    fn stmt(&mut self, project: &Project, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.expr(project, e),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.operator("if");
                self.expr(project, condition);
                self.block(project, then_branch);
                match else_branch {
                    Some(ElseBranch::Else(block)) => {
                        self.operator("else");
                        self.block(project, block);
                    }
                    Some(ElseBranch::ElseIf(stmt)) => {
                        self.operator("else");
                        self.stmt(project, stmt);
                    }
                    None => {}
                }
            }
            Stmt::Switch { subject, cases } => {
                self.operator("switch");
                self.expr(project, subject);
                for case in cases {
                    self.operator(if case.is_default { "default" } else { "case" });
                    self.block(project, &case.body);
                }
            }
            Stmt::While { condition, body } => {
                self.operator("while");
                self.expr(project, condition);
                self.block(project, body);
            }
            Stmt::DoWhile { body, condition } => {
                self.operator("do");
                self.block(project, body);
                self.expr(project, condition);
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                self.operator("for");
                for expr in [init, condition, update].into_iter().flatten() {
                    self.expr(project, expr);
                }
                self.block(project, body);
            }
            Stmt::Foreach { subject, body } => {
                self.operator("foreach");
                self.expr(project, subject);
                self.block(project, body);
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.operator("try");
                self.block(project, body);
                for catch in catches {
                    self.operator("catch");
                    if let Some(ty) = catch.exception {
                        self.operand(&project.type_def(ty).name);
                    }
                    self.block(project, &catch.body);
                }
                if let Some(block) = finally {
                    self.operator("finally");
                    self.block(project, block);
                }
            }
            Stmt::Return(value) => {
                self.operator("return");
                if let Some(e) = value {
                    self.expr(project, e);
                }
            }
            Stmt::Throw(e) => {
                self.operator("throw");
                self.expr(project, e);
            }
            Stmt::Break => self.operator("break"),
            Stmt::Continue => self.operator("continue"),
            Stmt::Scope(block) => self.block(project, block),
        }
    }

    fn expr(&mut self, project: &Project, expr: &Expr) {
        match expr {
            Expr::Variable(name) => self.operand(name),
            Expr::Literal(literal) => self.operand(&literal.token()),
            Expr::Binary { op, left, right } => {
                self.operator(op.token());
                self.expr(project, left);
                self.expr(project, right);
            }
            Expr::Unary { op, operand } => {
                self.operator(op.token());
                self.expr(project, operand);
            }
            Expr::Assign { target, value } => {
                self.operator("=");
                self.expr(project, target);
                self.expr(project, value);
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.operator("?:");
                self.expr(project, condition);
                if let Some(e) = then_branch {
                    self.expr(project, e);
                }
                self.expr(project, else_branch);
            }
            Expr::Call { name, args } => {
                self.operator("()");
                self.operand(name);
                for arg in args {
                    self.expr(project, arg);
                }
            }
            Expr::MethodCall {
                receiver,
                name,
                args,
            } => {
                self.operator("->");
                self.operator("()");
                self.operand(name);
                self.expr(project, receiver);
                for arg in args {
                    self.expr(project, arg);
                }
            }
            Expr::StaticCall { class, name, args } => {
                self.operator("::");
                self.operator("()");
                self.operand(&project.type_def(*class).name);
                self.operand(name);
                for arg in args {
                    self.expr(project, arg);
                }
            }
            Expr::New { class, args } => {
                self.operator("new");
                self.operand(&project.type_def(*class).name);
                for arg in args {
                    self.expr(project, arg);
                }
            }
            Expr::PropertyFetch { receiver, name } => {
                self.operator("->");
                self.operand(name);
                self.expr(project, receiver);
            }
            Expr::ClassRef(class) => self.operand(&project.type_def(*class).name),
            Expr::InstanceOf { expr, class } => {
                self.operator("instanceof");
                self.operand(&project.type_def(*class).name);
                self.expr(project, expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cache::MemoryCacheDriver;
    use crate::model::stmt::UnaryOp;
    use approx::assert_relative_eq;

    /// `if ($a) { $b = !$c; } else { return; } return $b;`
    ///
    /// Operators: if, =, !, else, return, return. Operands: a, b, c, b.
    fn reference_body() -> Block {
        Block::new(vec![
            Stmt::If {
                condition: Expr::var("a"),
                then_branch: Block::new(vec![Stmt::Expr(Expr::assign_var(
                    "b",
                    Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(Expr::var("c")),
                    },
                ))]),
                else_branch: Some(ElseBranch::Else(Block::new(vec![Stmt::Return(None)]))),
            },
            Stmt::Return(Some(Expr::var("b"))),
        ])
    }

    fn analyzed() -> (MetricSet, CallableId) {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "toggle");
        project.set_body(f, reference_body());

        let mut analyzer = HalsteadAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        (analyzer.node_metrics(NodeId::Callable(f)), f)
    }

    #[test]
    fn test_default_construction() {
        assert_eq!(HalsteadAnalyzer::default().id(), AnalyzerId::Halstead);
    }

    #[test]
    fn test_base_counts() {
        let (metrics, _) = analyzed();
        assert_eq!(metrics.get_int("n1"), Some(5));
        assert_eq!(metrics.get_int("n2"), Some(3));
        assert_eq!(metrics.get_int("N1"), Some(6));
        assert_eq!(metrics.get_int("N2"), Some(4));
    }

    #[test]
    fn test_derived_metrics() {
        let (metrics, _) = analyzed();
        assert_eq!(metrics.get_f64("hnt"), Some(10.0));
        assert_eq!(metrics.get_f64("hnd"), Some(8.0));
        // 10 * log2(8)
        assert_eq!(metrics.get_f64("hv"), Some(30.0));
        assert_relative_eq!(metrics.get_f64("hd").unwrap(), 10.0 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(metrics.get_f64("hl").unwrap(), 0.3, max_relative = 1e-12);
        assert_relative_eq!(metrics.get_f64("he").unwrap(), 100.0, max_relative = 1e-12);
        assert_relative_eq!(
            metrics.get_f64("ht").unwrap(),
            100.0 / 18.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            metrics.get_f64("hb").unwrap(),
            100.0f64.powf(2.0 / 3.0) / 3000.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(metrics.get_f64("hi").unwrap(), 9.0, max_relative = 1e-12);
    }

    /// Two distinct operators (`=` twice, `+` three times) over ten
    /// occurrences of `$a`/`$b`: the counts land on round derived values.
    fn saturated_body() -> Block {
        use crate::model::stmt::BinaryOp;
        let sum = || Stmt::Expr(Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b")));
        Block::new(vec![
            Stmt::Expr(Expr::assign_var("a", Expr::var("b"))),
            Stmt::Expr(Expr::assign_var("b", Expr::var("a"))),
            sum(),
            sum(),
            sum(),
        ])
    }

    #[test]
    fn test_round_basis_derived_set() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "churn");
        project.set_body(f, saturated_body());

        let mut analyzer = HalsteadAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        let metrics = analyzer.node_metrics(NodeId::Callable(f));

        assert_eq!(metrics.get_int("n1"), Some(2));
        assert_eq!(metrics.get_int("n2"), Some(2));
        assert_eq!(metrics.get_int("N1"), Some(5));
        assert_eq!(metrics.get_int("N2"), Some(10));
        // 15 * log2(4)
        assert_eq!(metrics.get_f64("hv"), Some(30.0));
        assert_eq!(metrics.get_f64("hd"), Some(5.0));
        assert_eq!(metrics.get_f64("hl"), Some(0.2));
        assert_eq!(metrics.get_f64("he"), Some(150.0));
        assert_relative_eq!(
            metrics.get_f64("ht").unwrap(),
            150.0 / 18.0,
            max_relative = 1e-12
        );
        // 150^(2/3) / 3000
        assert_relative_eq!(
            metrics.get_f64("hb").unwrap(),
            0.00941036,
            max_relative = 1e-6
        );
        assert_eq!(metrics.get_f64("hi"), Some(6.0));
    }

    #[test]
    fn test_empty_body_has_zero_volume() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "noop");

        let mut analyzer = HalsteadAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        let metrics = analyzer.node_metrics(NodeId::Callable(f));
        assert_eq!(metrics.get_f64("hv"), Some(0.0));
        assert_eq!(metrics.get_f64("hd"), Some(0.0));
        assert_eq!(metrics.get_f64("hl"), Some(0.0));
    }

    #[test]
    fn test_cache_round_trip_is_bit_identical() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "toggle");
        project.set_body(f, reference_body());

        let driver: Arc<dyn CacheDriver> = Arc::new(MemoryCacheDriver::new());
        let mut warm = HalsteadAnalyzer::new();
        warm.set_cache(Arc::clone(&driver));
        warm.analyze(&project).unwrap();

        let mut restored = HalsteadAnalyzer::new();
        restored.set_cache(driver);
        restored.analyze(&project).unwrap();

        assert_eq!(
            warm.node_metrics(NodeId::Callable(f)),
            restored.node_metrics(NodeId::Callable(f))
        );
    }

    #[test]
    fn test_interface_methods_are_skipped() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let iface = project.add_interface(ns, "Runner");
        let m = project.add_method(iface, "run");

        let mut analyzer = HalsteadAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        assert!(analyzer.node_metrics(NodeId::Callable(m)).is_empty());
    }
}
