//! Visitor traversal over the project model.
//!
//! One canonical traversal order serves every analyzer: namespaces in
//! insertion order, then each namespace's types (dispatched by kind) and
//! functions, then each type's methods and properties. Analyzers implement
//! [`AstVisitor`] and override only the hooks they care about; the default
//! hooks continue walking so a single override observes the whole project.

use crate::model::{NamespaceId, Project, Property, TypeId, TypeKind};
use crate::model::CallableId;

/// Per-node-kind visit hooks with default traversal behavior.
pub trait AstVisitor {
    /// Visit a namespace; the default walks its types and functions.
    fn visit_namespace(&mut self, project: &Project, id: NamespaceId) {
        walk_namespace(self, project, id);
    }

    /// Visit a class; the default walks its methods and properties.
    fn visit_class(&mut self, project: &Project, id: TypeId) {
        walk_type(self, project, id);
    }

    /// Visit an interface; the default walks its methods.
    fn visit_interface(&mut self, project: &Project, id: TypeId) {
        walk_type(self, project, id);
    }

    /// Visit a trait; the default walks its methods and properties.
    fn visit_trait(&mut self, project: &Project, id: TypeId) {
        walk_type(self, project, id);
    }

    /// Visit a method. No default traversal below callables.
    fn visit_method(&mut self, _project: &Project, _id: CallableId) {}

    /// Visit a free function. No default traversal below callables.
    fn visit_function(&mut self, _project: &Project, _id: CallableId) {}

    /// Visit a property declaration.
    fn visit_property(&mut self, _project: &Project, _owner: TypeId, _property: &Property) {}
}

/// Walk every namespace of the project.
pub fn walk_project<V: AstVisitor + ?Sized>(visitor: &mut V, project: &Project) {
    let ids: Vec<NamespaceId> = project.namespaces().map(|ns| ns.id).collect();
    for id in ids {
        visitor.visit_namespace(project, id);
    }
}

/// Walk the types and functions of one namespace.
pub fn walk_namespace<V: AstVisitor + ?Sized>(
    visitor: &mut V,
    project: &Project,
    id: NamespaceId,
) {
    let ns = project.namespace(id);
    let types = ns.types.clone();
    let functions = ns.functions.clone();
    for ty in types {
        match project.type_def(ty).kind {
            TypeKind::Class => visitor.visit_class(project, ty),
            TypeKind::Interface => visitor.visit_interface(project, ty),
            TypeKind::Trait => visitor.visit_trait(project, ty),
        }
    }
    for function in functions {
        visitor.visit_function(project, function);
    }
}

/// Walk the methods and properties of one type.
pub fn walk_type<V: AstVisitor + ?Sized>(visitor: &mut V, project: &Project, id: TypeId) {
    let methods = project.type_def(id).methods.clone();
    for method in methods {
        visitor.visit_method(project, method);
    }
    let def = project.type_def(id);
    for property in def.properties.clone() {
        visitor.visit_property(project, id, &property);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingVisitor {
        classes: usize,
        interfaces: usize,
        methods: usize,
        functions: usize,
        properties: usize,
    }

    impl AstVisitor for CountingVisitor {
        fn visit_class(&mut self, project: &Project, id: TypeId) {
            self.classes += 1;
            walk_type(self, project, id);
        }

        fn visit_interface(&mut self, project: &Project, id: TypeId) {
            self.interfaces += 1;
            walk_type(self, project, id);
        }

        fn visit_method(&mut self, _project: &Project, _id: CallableId) {
            self.methods += 1;
        }

        fn visit_function(&mut self, _project: &Project, _id: CallableId) {
            self.functions += 1;
        }

        fn visit_property(&mut self, _project: &Project, _owner: TypeId, _property: &Property) {
            self.properties += 1;
        }
    }

    #[test]
    fn test_walk_reaches_every_node_kind() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let class = project.add_class(ns, "Order");
        project.add_method(class, "total");
        project.add_method(class, "items");
        project.add_property(class, "id", crate::model::Visibility::Private, None);
        let iface = project.add_interface(ns, "Pricable");
        project.add_method(iface, "price");
        project.add_function(ns, "format_money");

        let mut visitor = CountingVisitor::default();
        walk_project(&mut visitor, &project);

        assert_eq!(visitor.classes, 1);
        assert_eq!(visitor.interfaces, 1);
        assert_eq!(visitor.methods, 3);
        assert_eq!(visitor.functions, 1);
        assert_eq!(visitor.properties, 1);
    }

    #[test]
    fn test_traversal_is_repeatable() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        project.add_class(ns, "A");
        project.add_class(ns, "B");

        let mut first = CountingVisitor::default();
        walk_project(&mut first, &project);
        let mut second = CountingVisitor::default();
        walk_project(&mut second, &project);
        assert_eq!(first.classes, second.classes);
    }
}
