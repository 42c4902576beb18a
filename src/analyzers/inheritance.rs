//! Inheritance analyzer: depth of inheritance, direct children, and
//! added/overridden method counts per class.

use indexmap::{IndexMap, IndexSet};

use crate::core::errors::Result;
use crate::metrics::{AnalyzerId, MetricSet, MetricsAnalyzer};
use crate::model::{NodeId, Project, TypeId, TypeKind, Visibility};

#[derive(Debug, Clone, Copy, Default)]
struct ClassMetrics {
    dit: i64,
    nocc: i64,
    noam: i64,
    noom: i64,
}

/// Per-class inheritance metrics (`dit`, `nocc`, `noam`, `noom`) and
/// project aggregates (`andc`, `ahh`, `maxDIT`).
///
/// A parent that resolves to a placeholder type ends the ancestry walk but
/// still deepens the tree by two levels: the unresolvable boundary itself
/// counts in addition to the reference to it.
#[derive(Default)]
pub struct InheritanceAnalyzer {
    classes: IndexMap<TypeId, ClassMetrics>,
    average_derived: f64,
    average_height: f64,
    max_dit: i64,
}

impl InheritanceAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    fn depth_of_inheritance(project: &Project, ty: TypeId) -> i64 {
        let mut dit = 0;
        let mut seen: IndexSet<TypeId> = IndexSet::new();
        seen.insert(ty);
        let mut current = ty;
        while let Some(parent) = project.type_def(current).parent {
            if !seen.insert(parent) {
                break;
            }
            if project.type_def(parent).user_defined {
                dit += 1;
                current = parent;
            } else {
                dit += 2;
                break;
            }
        }
        dit
    }

    /// Method name → visibility over all user-defined ancestors, nearest
    /// declaration winning.
    fn ancestor_methods(project: &Project, ty: TypeId) -> IndexMap<String, Visibility> {
        let mut methods = IndexMap::new();
        let mut seen: IndexSet<TypeId> = IndexSet::new();
        seen.insert(ty);
        let mut current = project.type_def(ty).parent;
        while let Some(parent) = current {
            if !seen.insert(parent) || !project.type_def(parent).user_defined {
                break;
            }
            for method in &project.type_def(parent).methods {
                let callable = project.callable(*method);
                if let crate::model::CallableKind::Method { visibility, .. } = callable.kind {
                    methods
                        .entry(callable.name.clone())
                        .or_insert(visibility);
                }
            }
            current = project.type_def(parent).parent;
        }
        methods
    }

    /// Longest user-defined subclass chain below a class.
    fn hierarchy_height(project: &Project, ty: TypeId) -> i64 {
        project
            .subclasses_of(ty)
            .into_iter()
            .map(|child| 1 + Self::hierarchy_height(project, child))
            .max()
            .unwrap_or(0)
    }
}

impl MetricsAnalyzer for InheritanceAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Inheritance
    }

    fn analyze(&mut self, project: &Project) -> Result<()> {
        self.classes.clear();
        self.max_dit = 0;

        let mut total_children = 0i64;
        let mut class_count = 0i64;
        for ty in project.types() {
            if !ty.user_defined || ty.kind != TypeKind::Class {
                continue;
            }
            class_count += 1;

            let dit = Self::depth_of_inheritance(project, ty.id);
            let nocc = project.subclasses_of(ty.id).len() as i64;
            total_children += nocc;

            let ancestors = Self::ancestor_methods(project, ty.id);
            let mut noam = 0;
            let mut noom = 0;
            for method in &ty.methods {
                let name = &project.callable(*method).name;
                match ancestors.get(name) {
                    Some(Visibility::Private) | None => noam += 1,
                    Some(_) => noom += 1,
                }
            }

            self.max_dit = self.max_dit.max(dit);
            self.classes.insert(
                ty.id,
                ClassMetrics {
                    dit,
                    nocc,
                    noam,
                    noom,
                },
            );
        }

        self.average_derived = if class_count > 0 {
            total_children as f64 / class_count as f64
        } else {
            0.0
        };

        let roots: Vec<TypeId> = self
            .classes
            .keys()
            .copied()
            .filter(|id| {
                project
                    .type_def(*id)
                    .parent
                    .map_or(true, |p| !project.type_def(p).user_defined)
            })
            .collect();
        self.average_height = if roots.is_empty() {
            0.0
        } else {
            let total: i64 = roots
                .iter()
                .map(|root| Self::hierarchy_height(project, *root))
                .sum();
            total as f64 / roots.len() as f64
        };
        Ok(())
    }

    fn node_metrics(&self, node: NodeId) -> MetricSet {
        let NodeId::Type(id) = node else {
            return MetricSet::new();
        };
        self.classes
            .get(&id)
            .map(|m| {
                MetricSet::new()
                    .with_int("dit", m.dit)
                    .with_int("nocc", m.nocc)
                    .with_int("noam", m.noam)
                    .with_int("noom", m.noom)
            })
            .unwrap_or_default()
    }

    fn project_metrics(&self) -> MetricSet {
        MetricSet::new()
            .with_float("andc", self.average_derived)
            .with_float("ahh", self.average_height)
            .with_int("maxDIT", self.max_dit)
    }
}
