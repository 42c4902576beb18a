//! Node count analyzer: classes, interfaces, methods, and functions per
//! namespace, with project-wide totals.

use indexmap::IndexMap;

use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::visitor::{walk_project, walk_type, AstVisitor};
use crate::model::{CallableId, NamespaceId, NodeId, Project, TypeId};

#[derive(Debug, Clone, Copy, Default)]
struct NamespaceCounts {
    classes: i64,
    interfaces: i64,
    methods: i64,
    functions: i64,
}

/// Counts user-defined classes (`noc`), interfaces (`noi`), methods
/// (`nom`), and functions (`nof`) per namespace, plus per-type method
/// counts and project totals including the namespace count (`nop`).
///
/// Placeholder types and the synthetic namespaces hosting them contribute
/// nothing.
#[derive(Default)]
pub struct NodeCountAnalyzer {
    namespaces: IndexMap<NamespaceId, NamespaceCounts>,
    type_methods: IndexMap<TypeId, i64>,
    current: Option<NamespaceId>,
}

impl NodeCountAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AstVisitor for NodeCountAnalyzer {
    fn visit_namespace(&mut self, project: &Project, id: NamespaceId) {
        if project.namespace(id).is_synthetic() {
            return;
        }
        self.namespaces.entry(id).or_default();
        self.current = Some(id);
        crate::model::visitor::walk_namespace(self, project, id);
        self.current = None;
    }

    fn visit_class(&mut self, project: &Project, id: TypeId) {
        if !project.type_def(id).user_defined {
            return;
        }
        if let Some(ns) = self.current {
            self.namespaces[&ns].classes += 1;
        }
        self.type_methods.insert(id, 0);
        walk_type(self, project, id);
    }

    fn visit_interface(&mut self, project: &Project, id: TypeId) {
        if !project.type_def(id).user_defined {
            return;
        }
        if let Some(ns) = self.current {
            self.namespaces[&ns].interfaces += 1;
        }
        self.type_methods.insert(id, 0);
        walk_type(self, project, id);
    }

    fn visit_trait(&mut self, project: &Project, id: TypeId) {
        if !project.type_def(id).user_defined {
            return;
        }
        self.type_methods.insert(id, 0);
        walk_type(self, project, id);
    }

    fn visit_method(&mut self, project: &Project, id: CallableId) {
        if let crate::model::CallableKind::Method { owner, .. } = project.callable(id).kind {
            if let Some(count) = self.type_methods.get_mut(&owner) {
                *count += 1;
            }
        }
        if let Some(ns) = self.current {
            self.namespaces[&ns].methods += 1;
        }
    }

    fn visit_function(&mut self, _project: &Project, _id: CallableId) {
        if let Some(ns) = self.current {
            self.namespaces[&ns].functions += 1;
        }
    }
}

impl MetricsAnalyzer for NodeCountAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::NodeCount
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.namespaces.clear();
        self.type_methods.clear();
        self.current = None;
        walk_project(self, project);
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        match node {
            NodeId::Namespace(id) => self
                .namespaces
                .get(&id)
                .map(|counts| {
                    MetricSet::new()
                        .with_int("noc", counts.classes)
                        .with_int("noi", counts.interfaces)
                        .with_int("nom", counts.methods)
                        .with_int("nof", counts.functions)
                })
                .unwrap_or_default(),
            NodeId::Type(id) => self
                .type_methods
                .get(&id)
                .map(|methods| MetricSet::new().with_int("nom", *methods))
                .unwrap_or_default(),
            _ => MetricSet::new(),
        }
    }

    fn project_metrics(&self) -> MetricSet {
        let mut totals = NamespaceCounts::default();
        for counts in self.namespaces.values() {
            totals.classes += counts.classes;
            totals.interfaces += counts.interfaces;
            totals.methods += counts.methods;
            totals.functions += counts.functions;
        }
        MetricSet::new()
            .with_int("nop", self.namespaces.len() as i64)
            .with_int("noc", totals.classes)
            .with_int("noi", totals.interfaces)
            .with_int("nom", totals.methods)
            .with_int("nof", totals.functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Visibility;

    #[test]
    fn test_counts_per_namespace_and_project() {
        let mut project = Project::new();
        let app = project.add_namespace("app");
        let order = project.add_class(app, "Order");
        project.add_method(order, "total");
        project.add_method(order, "items");
        let pricable = project.add_interface(app, "Pricable");
        project.add_method(pricable, "price");
        project.add_function(app, "format_money");

        let util = project.add_namespace("util");
        project.add_function(util, "clamp");

        let mut analyzer = NodeCountAnalyzer::new();
        analyzer.analyze(&project).unwrap();

        let app_metrics = analyzer.node_metrics(NodeId::Namespace(app));
        assert_eq!(app_metrics.get_int("noc"), Some(1));
        assert_eq!(app_metrics.get_int("noi"), Some(1));
        assert_eq!(app_metrics.get_int("nom"), Some(3));
        assert_eq!(app_metrics.get_int("nof"), Some(1));

        let order_metrics = analyzer.node_metrics(NodeId::Type(order));
        assert_eq!(order_metrics.get_int("nom"), Some(2));

        let totals = analyzer.project_metrics();
        assert_eq!(totals.get_int("nop"), Some(2));
        assert_eq!(totals.get_int("noc"), Some(1));
        assert_eq!(totals.get_int("nom"), Some(3));
        assert_eq!(totals.get_int("nof"), Some(2));
    }

    #[test]
    fn test_placeholders_do_not_count() {
        let mut project = Project::new();
        let app = project.add_namespace("app");
        let order = project.add_class(app, "Order");
        let builtin = project.placeholder_type("ArrayObject");
        project.set_parent(order, builtin);

        let mut analyzer = NodeCountAnalyzer::new();
        analyzer.analyze(&project).unwrap();

        let totals = analyzer.project_metrics();
        assert_eq!(totals.get_int("noc"), Some(1));
        // the synthetic namespace hosting the placeholder is not a package
        assert_eq!(totals.get_int("nop"), Some(1));
        assert!(analyzer.node_metrics(NodeId::Type(builtin)).is_empty());
    }

    #[test]
    fn test_unknown_node_is_empty() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let class = project.add_class(ns, "Order");
        project.add_property(class, "id", Visibility::Private, None);

        let mut analyzer = NodeCountAnalyzer::new();
        analyzer.analyze(&project).unwrap();
        assert!(analyzer
            .node_metrics(NodeId::Namespace(NamespaceId(99)))
            .is_empty());
    }
}
