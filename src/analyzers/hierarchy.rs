//! Class hierarchy analyzer: project-wide shape of the inheritance forest.

use indexmap::IndexSet;

use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{NodeId, Project, TypeId, TypeKind};

/// Classifies user-defined classes as abstract (`clsa`) or concrete
/// (`clsc`), and as hierarchy roots (`roots`, no user-defined parent) or
/// leaves (`leafs`, no user-defined subclass). Exposes project metrics
/// only; per-node queries are always empty.
#[derive(Default)]
pub struct HierarchyAnalyzer {
    abstract_classes: i64,
    concrete_classes: i64,
    roots: i64,
    leafs: i64,
}

impl HierarchyAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsAnalyzer for HierarchyAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Hierarchy
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.abstract_classes = 0;
        self.concrete_classes = 0;
        self.roots = 0;
        self.leafs = 0;

        let mut parents: IndexSet<TypeId> = IndexSet::new();
        for ty in project.types() {
            if ty.user_defined && ty.kind == TypeKind::Class {
                if let Some(parent) = ty.parent {
                    parents.insert(parent);
                }
            }
        }

        for ty in project.types() {
            if !ty.user_defined || ty.kind != TypeKind::Class {
                continue;
            }
            if ty.is_abstract {
                self.abstract_classes += 1;
            } else {
                self.concrete_classes += 1;
            }
            let has_user_parent = ty
                .parent
                .is_some_and(|p| project.type_def(p).user_defined);
            if !has_user_parent {
                self.roots += 1;
            }
            if !parents.contains(&ty.id) {
                self.leafs += 1;
            }
        }
        Ok(())
    }

    fn node_metrics(&self, _node: NodeId) -> MetricSet {
        MetricSet::new()
    }

    fn project_metrics(&self) -> MetricSet {
        MetricSet::new()
            .with_int("clsa", self.abstract_classes)
            .with_int("clsc", self.concrete_classes)
            .with_int("roots", self.roots)
            .with_int("leafs", self.leafs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_shape() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let base = project.add_class(ns, "Shape");
        project.set_abstract(base);
        let circle = project.add_class(ns, "Circle");
        project.set_parent(circle, base);
        let square = project.add_class(ns, "Square");
        project.set_parent(square, base);
        project.add_class(ns, "Standalone");

        let mut analyzer = HierarchyAnalyzer::new();
        analyzer.analyze(&project).unwrap();

        let metrics = analyzer.project_metrics();
        assert_eq!(metrics.get_int("clsa"), Some(1));
        assert_eq!(metrics.get_int("clsc"), Some(3));
        // Shape and Standalone have no user-defined parent
        assert_eq!(metrics.get_int("roots"), Some(2));
        // everything except Shape is childless
        assert_eq!(metrics.get_int("leafs"), Some(3));
    }

    #[test]
    fn test_placeholder_parent_keeps_class_a_root() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let class = project.add_class(ns, "Wrapper");
        let builtin = project.placeholder_type("ArrayObject");
        project.set_parent(class, builtin);

        let mut analyzer = HierarchyAnalyzer::new();
        analyzer.analyze(&project).unwrap();

        let metrics = analyzer.project_metrics();
        assert_eq!(metrics.get_int("roots"), Some(1));
        assert_eq!(metrics.get_int("clsc"), Some(1));
    }

    #[test]
    fn test_node_metrics_are_always_empty() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let class = project.add_class(ns, "Order");

        let mut analyzer = HierarchyAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        assert!(analyzer.node_metrics(NodeId::Type(class)).is_empty());
    }
}
