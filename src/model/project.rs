//! The materialized AST consumed by the metric analyzers.
//!
//! The model is an arena: every namespace, type, callable, and compilation
//! unit lives in a flat vector owned by [`Project`] and is addressed through
//! a copyable id newtype. Ids double as the stable node identity that metric
//! stores and cache keys are built on. Analyzers never mutate the model.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::model::stmt::{Block, Expr, Stmt};

/// Name of the synthetic namespace holding unresolved and builtin types.
pub const GLOBAL_NAMESPACE: &str = "+global";

/// Identity of a namespace within one [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub u32);

/// Identity of a type (class, interface, or trait).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Identity of a callable (method or function).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallableId(pub u32);

/// Identity of a compilation unit (source file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Stable identity of any AST node metrics can be recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// A namespace node
    Namespace(NamespaceId),
    /// A type node
    Type(TypeId),
    /// A callable node
    Callable(CallableId),
    /// A compilation-unit node
    Unit(UnitId),
}

/// A line range within a compilation unit. Lines are 1-based; a default
/// span (0..0) means "no source position known".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// First line of the span
    pub start_line: usize,
    /// Last line of the span (inclusive)
    pub end_line: usize,
}

impl SourceSpan {
    /// A span covering `start..=end`.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Number of physical lines covered, 0 for an unknown span.
    pub fn line_count(&self) -> usize {
        if self.start_line == 0 || self.end_line < self.start_line {
            0
        } else {
            self.end_line - self.start_line + 1
        }
    }

    /// Number of lines shared with another span.
    pub fn overlap(&self, other: &SourceSpan) -> usize {
        let start = self.start_line.max(other.start_line);
        let end = self.end_line.min(other.end_line);
        if start == 0 || end < start {
            0
        } else {
            end - start + 1
        }
    }

    /// Whether the given line falls within this span.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Public member
    Public,
    /// Protected member
    Protected,
    /// Private member
    Private,
}

/// Discriminator for the three type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// A class
    Class,
    /// An interface
    Interface,
    /// A trait
    Trait,
}

/// A named grouping of types and functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    /// The namespace id
    pub id: NamespaceId,
    /// The namespace name, unique within one project
    pub name: String,
    /// Contained types in declaration order
    pub types: Vec<TypeId>,
    /// Contained free functions in declaration order
    pub functions: Vec<CallableId>,
}

impl Namespace {
    /// Whether this is a synthetic namespace (`+global` and friends) that
    /// exists only to host unresolved placeholder types.
    pub fn is_synthetic(&self) -> bool {
        self.name.starts_with('+')
    }
}

/// A class, interface, or trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    /// The type id
    pub id: TypeId,
    /// The type name
    pub name: String,
    /// The owning namespace
    pub namespace: NamespaceId,
    /// Class/interface/trait discriminator
    pub kind: TypeKind,
    /// Whether the type is declared abstract
    pub is_abstract: bool,
    /// Whether the type was declared in analyzed source. Placeholder types
    /// for unresolved or builtin references carry `false` and are skipped
    /// by every counting analyzer.
    pub user_defined: bool,
    /// The parent type, if any (single inheritance for classes; interface
    /// parents are modelled through `interfaces`)
    pub parent: Option<TypeId>,
    /// Implemented (or, for interfaces, extended) interfaces
    pub interfaces: Vec<TypeId>,
    /// Declared methods in declaration order
    pub methods: Vec<CallableId>,
    /// Declared properties in declaration order
    pub properties: Vec<Property>,
    /// Declared constants in declaration order
    pub constants: Vec<Constant>,
    /// The declaring compilation unit, if known
    pub unit: Option<UnitId>,
    /// The declaration span
    pub span: SourceSpan,
}

/// A declared property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// The property name
    pub name: String,
    /// Declared visibility
    pub visibility: Visibility,
    /// The resolved property type, if declared
    pub type_ref: Option<TypeId>,
    /// The declaration span
    pub span: SourceSpan,
}

/// A declared class constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    /// The constant name
    pub name: String,
    /// The declaration span
    pub span: SourceSpan,
}

/// Method/function discriminator with owner context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallableKind {
    /// A method declared on a type
    Method {
        /// The declaring type
        owner: TypeId,
        /// Declared visibility
        visibility: Visibility,
        /// Whether the method is abstract (no body)
        is_abstract: bool,
    },
    /// A free function declared in a namespace
    Function {
        /// The declaring namespace
        namespace: NamespaceId,
    },
}

/// A method or function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callable {
    /// The callable id
    pub id: CallableId,
    /// The callable name
    pub name: String,
    /// Method/function discriminator
    pub kind: CallableKind,
    /// Declared parameters in order
    pub params: Vec<Parameter>,
    /// The resolved return type, if declared
    pub return_type: Option<TypeId>,
    /// Declared thrown exception types
    pub throws: Vec<TypeId>,
    /// The statement tree; `None` for abstract and interface methods
    pub body: Option<Block>,
    /// The declaring compilation unit, if known
    pub unit: Option<UnitId>,
    /// The declaration span
    pub span: SourceSpan,
}

impl Callable {
    /// Whether this callable has an analyzable body.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Whether this is an abstract method (declared without a body).
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, CallableKind::Method { is_abstract, .. } if is_abstract)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// The parameter name
    pub name: String,
    /// The resolved parameter type, if declared
    pub type_ref: Option<TypeId>,
}

/// One source file contributing to the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// The unit id
    pub id: UnitId,
    /// The source file path; `None` for synthetic units
    pub file_name: Option<PathBuf>,
    /// Total physical lines in the file
    pub line_count: usize,
    /// Comment spans within the file
    pub comments: Vec<SourceSpan>,
}

/// The complete materialized AST for one analysis run.
///
/// Namespaces iterate in insertion order and repeatably, so a multi-pass
/// analyzer sees an identical sequence on every traversal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    namespaces: Vec<Namespace>,
    types: Vec<TypeDef>,
    callables: Vec<Callable>,
    units: Vec<CompilationUnit>,
    namespace_index: IndexMap<String, NamespaceId>,
}

impl Project {
    /// Create an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- construction (used by external AST builders and fixtures) ----

    /// Get or create the namespace with the given name.
    pub fn add_namespace(&mut self, name: impl Into<String>) -> NamespaceId {
        let name = name.into();
        if let Some(id) = self.namespace_index.get(&name) {
            return *id;
        }
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces.push(Namespace {
            id,
            name: name.clone(),
            types: Vec::new(),
            functions: Vec::new(),
        });
        self.namespace_index.insert(name, id);
        id
    }

    /// Add a compilation unit.
    pub fn add_unit(&mut self, file_name: Option<PathBuf>, line_count: usize) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(CompilationUnit {
            id,
            file_name,
            line_count,
            comments: Vec::new(),
        });
        id
    }

    /// Record a comment span within a unit.
    pub fn add_comment(&mut self, unit: UnitId, span: SourceSpan) {
        self.units[unit.0 as usize].comments.push(span);
    }

    fn add_type(&mut self, namespace: NamespaceId, name: String, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDef {
            id,
            name,
            namespace,
            kind,
            is_abstract: false,
            user_defined: true,
            parent: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
            unit: None,
            span: SourceSpan::default(),
        });
        self.namespaces[namespace.0 as usize].types.push(id);
        id
    }

    /// Add a user-defined class.
    pub fn add_class(&mut self, namespace: NamespaceId, name: impl Into<String>) -> TypeId {
        self.add_type(namespace, name.into(), TypeKind::Class)
    }

    /// Add a user-defined interface.
    pub fn add_interface(&mut self, namespace: NamespaceId, name: impl Into<String>) -> TypeId {
        let id = self.add_type(namespace, name.into(), TypeKind::Interface);
        self.types[id.0 as usize].is_abstract = true;
        id
    }

    /// Add a user-defined trait.
    pub fn add_trait(&mut self, namespace: NamespaceId, name: impl Into<String>) -> TypeId {
        self.add_type(namespace, name.into(), TypeKind::Trait)
    }

    /// Get or create a placeholder type for an unresolved or builtin
    /// reference. Placeholders live in the synthetic `+global` namespace
    /// and are not user-defined.
    pub fn placeholder_type(&mut self, name: impl Into<String>) -> TypeId {
        let name = name.into();
        let ns = self.add_namespace(GLOBAL_NAMESPACE);
        if let Some(existing) = self.namespaces[ns.0 as usize]
            .types
            .iter()
            .find(|id| self.types[id.0 as usize].name == name)
        {
            return *existing;
        }
        let id = self.add_type(ns, name, TypeKind::Class);
        self.types[id.0 as usize].user_defined = false;
        id
    }

    /// Mark a type abstract.
    pub fn set_abstract(&mut self, ty: TypeId) {
        self.types[ty.0 as usize].is_abstract = true;
    }

    /// Set the parent type of a class or interface.
    pub fn set_parent(&mut self, child: TypeId, parent: TypeId) {
        self.types[child.0 as usize].parent = Some(parent);
    }

    /// Record an implemented (or extended) interface.
    pub fn add_interface_impl(&mut self, ty: TypeId, interface: TypeId) {
        self.types[ty.0 as usize].interfaces.push(interface);
    }

    /// Attach a type to a compilation unit with its declaration span.
    pub fn set_type_location(&mut self, ty: TypeId, unit: UnitId, span: SourceSpan) {
        let def = &mut self.types[ty.0 as usize];
        def.unit = Some(unit);
        def.span = span;
    }

    /// Add a public concrete method with an empty body.
    pub fn add_method(&mut self, owner: TypeId, name: impl Into<String>) -> CallableId {
        self.add_method_with(owner, name, Visibility::Public, false)
    }

    /// Add a method with explicit visibility and abstractness. Abstract
    /// methods (and every interface method) carry no body.
    pub fn add_method_with(
        &mut self,
        owner: TypeId,
        name: impl Into<String>,
        visibility: Visibility,
        is_abstract: bool,
    ) -> CallableId {
        let interface_method = self.types[owner.0 as usize].kind == TypeKind::Interface;
        let bodyless = is_abstract || interface_method;
        let id = CallableId(self.callables.len() as u32);
        self.callables.push(Callable {
            id,
            name: name.into(),
            kind: CallableKind::Method {
                owner,
                visibility,
                is_abstract: bodyless,
            },
            params: Vec::new(),
            return_type: None,
            throws: Vec::new(),
            body: if bodyless { None } else { Some(Block::empty()) },
            unit: None,
            span: SourceSpan::default(),
        });
        self.types[owner.0 as usize].methods.push(id);
        id
    }

    /// Add a free function with an empty body.
    pub fn add_function(&mut self, namespace: NamespaceId, name: impl Into<String>) -> CallableId {
        let id = CallableId(self.callables.len() as u32);
        self.callables.push(Callable {
            id,
            name: name.into(),
            kind: CallableKind::Function { namespace },
            params: Vec::new(),
            return_type: None,
            throws: Vec::new(),
            body: Some(Block::empty()),
            unit: None,
            span: SourceSpan::default(),
        });
        self.namespaces[namespace.0 as usize].functions.push(id);
        id
    }

    /// Replace a callable's body.
    pub fn set_body(&mut self, callable: CallableId, body: Block) {
        self.callables[callable.0 as usize].body = Some(body);
    }

    /// Add a parameter to a callable.
    pub fn add_param(
        &mut self,
        callable: CallableId,
        name: impl Into<String>,
        type_ref: Option<TypeId>,
    ) {
        self.callables[callable.0 as usize].params.push(Parameter {
            name: name.into(),
            type_ref,
        });
    }

    /// Set a callable's return type.
    pub fn set_return_type(&mut self, callable: CallableId, type_ref: TypeId) {
        self.callables[callable.0 as usize].return_type = Some(type_ref);
    }

    /// Record a declared thrown exception type.
    pub fn add_throw(&mut self, callable: CallableId, type_ref: TypeId) {
        self.callables[callable.0 as usize].throws.push(type_ref);
    }

    /// Attach a callable to a compilation unit with its declaration span.
    pub fn set_callable_location(&mut self, callable: CallableId, unit: UnitId, span: SourceSpan) {
        let c = &mut self.callables[callable.0 as usize];
        c.unit = Some(unit);
        c.span = span;
    }

    /// Add a property to a type.
    pub fn add_property(
        &mut self,
        owner: TypeId,
        name: impl Into<String>,
        visibility: Visibility,
        type_ref: Option<TypeId>,
    ) {
        self.types[owner.0 as usize].properties.push(Property {
            name: name.into(),
            visibility,
            type_ref,
            span: SourceSpan::default(),
        });
    }

    /// Add a constant to a type.
    pub fn add_constant(&mut self, owner: TypeId, name: impl Into<String>) {
        self.types[owner.0 as usize].constants.push(Constant {
            name: name.into(),
            span: SourceSpan::default(),
        });
    }

    // ---- accessors ----

    /// Ordered, repeatable iteration over all namespaces.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    /// Look up a namespace.
    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0 as usize]
    }

    /// Look up a namespace by name.
    pub fn namespace_by_name(&self, name: &str) -> Option<&Namespace> {
        self.namespace_index
            .get(name)
            .map(|id| self.namespace(*id))
    }

    /// Look up a type.
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0 as usize]
    }

    /// Iterate over all types in the project.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    /// Look up a callable.
    pub fn callable(&self, id: CallableId) -> &Callable {
        &self.callables[id.0 as usize]
    }

    /// Iterate over all callables in the project.
    pub fn callables(&self) -> impl Iterator<Item = &Callable> {
        self.callables.iter()
    }

    /// Look up a compilation unit.
    pub fn unit(&self, id: UnitId) -> &CompilationUnit {
        &self.units[id.0 as usize]
    }

    /// Iterate over all compilation units.
    pub fn units(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units.iter()
    }

    /// Find a unit by its file path.
    pub fn unit_by_file(&self, path: &Path) -> Option<&CompilationUnit> {
        self.units
            .iter()
            .find(|u| u.file_name.as_deref() == Some(path))
    }

    // ---- derived relations ----

    /// All distinct types a type depends on: parent, interfaces, property
    /// types, and per-method parameter/return/throw/body references. The
    /// type itself is excluded.
    pub fn type_dependencies(&self, ty: TypeId) -> IndexSet<TypeId> {
        let def = self.type_def(ty);
        let mut deps = IndexSet::new();
        if let Some(parent) = def.parent {
            deps.insert(parent);
        }
        deps.extend(def.interfaces.iter().copied());
        for property in &def.properties {
            if let Some(t) = property.type_ref {
                deps.insert(t);
            }
        }
        for method in &def.methods {
            deps.extend(self.callable_type_refs(*method));
        }
        deps.shift_remove(&ty);
        deps
    }

    /// All distinct types a callable references through its signature
    /// (parameters, return type, declared throws) and its body (object
    /// instantiation, static calls, class references, `instanceof`, catch
    /// clauses).
    pub fn callable_type_refs(&self, id: CallableId) -> IndexSet<TypeId> {
        let callable = self.callable(id);
        let mut refs = IndexSet::new();
        for param in &callable.params {
            if let Some(t) = param.type_ref {
                refs.insert(t);
            }
        }
        if let Some(t) = callable.return_type {
            refs.insert(t);
        }
        refs.extend(callable.throws.iter().copied());
        if let Some(body) = &callable.body {
            collect_block_types(body, &mut refs);
        }
        refs
    }

    /// Count call sites (function, method, and static calls) in a
    /// callable's body.
    pub fn call_count(&self, id: CallableId) -> usize {
        match &self.callable(id).body {
            Some(body) => count_block_calls(body),
            None => 0,
        }
    }

    /// Direct user-defined subclasses of a class.
    pub fn subclasses_of(&self, ty: TypeId) -> Vec<TypeId> {
        self.types
            .iter()
            .filter(|t| t.user_defined && t.parent == Some(ty))
            .map(|t| t.id)
            .collect()
    }

    // ---- fingerprints ----

    /// Content fingerprint of a callable: a stable hash over its name,
    /// signature, and body. Identical source yields an identical
    /// fingerprint across processes.
    pub fn callable_fingerprint(&self, id: CallableId) -> u64 {
        let callable = self.callable(id);
        let encoded = bincode::serialize(&(
            &callable.name,
            &callable.params,
            &callable.return_type,
            &callable.throws,
            &callable.body,
        ))
        .unwrap_or_default();
        xxh3_64(&encoded)
    }

    /// Layout fingerprint of a callable: the content fingerprint combined
    /// with the declaration span and the owning unit's line structure.
    /// Line-based results change when comments or spans move even if the
    /// body does not, so their caches key on this instead.
    pub fn callable_layout_fingerprint(&self, id: CallableId) -> u64 {
        let callable = self.callable(id);
        let unit = callable.unit.map(|unit| self.unit_fingerprint(unit));
        let encoded = bincode::serialize(&(
            self.callable_fingerprint(id),
            &callable.span,
            unit,
        ))
        .unwrap_or_default();
        xxh3_64(&encoded)
    }

    /// Content fingerprint of a compilation unit's line structure.
    pub fn unit_fingerprint(&self, id: UnitId) -> u64 {
        let unit = self.unit(id);
        let encoded =
            bincode::serialize(&(&unit.file_name, unit.line_count, &unit.comments))
                .unwrap_or_default();
        xxh3_64(&encoded)
    }
}

fn collect_block_types(block: &Block, refs: &mut IndexSet<TypeId>) {
    for stmt in &block.statements {
        collect_stmt_types(stmt, refs);
    }
}

fn collect_stmt_types(stmt: &Stmt, refs: &mut IndexSet<TypeId>) {
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) => collect_expr_types(e, refs),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_expr_types(condition, refs);
            collect_block_types(then_branch, refs);
            match else_branch {
                Some(crate::model::stmt::ElseBranch::Else(block)) => {
                    collect_block_types(block, refs)
                }
                Some(crate::model::stmt::ElseBranch::ElseIf(stmt)) => {
                    collect_stmt_types(stmt, refs)
                }
                None => {}
            }
        }
        Stmt::Switch { subject, cases } => {
            collect_expr_types(subject, refs);
            for case in cases {
                collect_block_types(&case.body, refs);
            }
        }
        Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
            collect_expr_types(condition, refs);
            collect_block_types(body, refs);
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
        } => {
            for expr in [init, condition, update].into_iter().flatten() {
                collect_expr_types(expr, refs);
            }
            collect_block_types(body, refs);
        }
        Stmt::Foreach { subject, body } => {
            collect_expr_types(subject, refs);
            collect_block_types(body, refs);
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            collect_block_types(body, refs);
            for catch in catches {
                if let Some(t) = catch.exception {
                    refs.insert(t);
                }
                collect_block_types(&catch.body, refs);
            }
            if let Some(block) = finally {
                collect_block_types(block, refs);
            }
        }
        Stmt::Return(Some(e)) => collect_expr_types(e, refs),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
        Stmt::Scope(block) => collect_block_types(block, refs),
    }
}

fn collect_expr_types(expr: &Expr, refs: &mut IndexSet<TypeId>) {
    match expr {
        Expr::Variable(_) | Expr::Literal(_) => {}
        Expr::Binary { left, right, .. } => {
            collect_expr_types(left, refs);
            collect_expr_types(right, refs);
        }
        Expr::Unary { operand, .. } => collect_expr_types(operand, refs),
        Expr::Assign { target, value } => {
            collect_expr_types(target, refs);
            collect_expr_types(value, refs);
        }
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_expr_types(condition, refs);
            if let Some(e) = then_branch {
                collect_expr_types(e, refs);
            }
            collect_expr_types(else_branch, refs);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_expr_types(arg, refs);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            collect_expr_types(receiver, refs);
            for arg in args {
                collect_expr_types(arg, refs);
            }
        }
        Expr::StaticCall { class, args, .. } | Expr::New { class, args } => {
            refs.insert(*class);
            for arg in args {
                collect_expr_types(arg, refs);
            }
        }
        Expr::PropertyFetch { receiver, .. } => collect_expr_types(receiver, refs),
        Expr::ClassRef(class) => {
            refs.insert(*class);
        }
        Expr::InstanceOf { expr, class } => {
            refs.insert(*class);
            collect_expr_types(expr, refs);
        }
    }
}

fn count_block_calls(block: &Block) -> usize {
    block.statements.iter().map(count_stmt_calls).sum()
}

fn count_stmt_calls(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::Expr(e) | Stmt::Throw(e) => count_expr_calls(e),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            count_expr_calls(condition)
                + count_block_calls(then_branch)
                + match else_branch {
                    Some(crate::model::stmt::ElseBranch::Else(block)) => {
                        count_block_calls(block)
                    }
                    Some(crate::model::stmt::ElseBranch::ElseIf(stmt)) => {
                        count_stmt_calls(stmt)
                    }
                    None => 0,
                }
        }
        Stmt::Switch { subject, cases } => {
            count_expr_calls(subject)
                + cases
                    .iter()
                    .map(|case| count_block_calls(&case.body))
                    .sum::<usize>()
        }
        Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
            count_expr_calls(condition) + count_block_calls(body)
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
        } => {
            [init, condition, update]
                .into_iter()
                .flatten()
                .map(count_expr_calls)
                .sum::<usize>()
                + count_block_calls(body)
        }
        Stmt::Foreach { subject, body } => count_expr_calls(subject) + count_block_calls(body),
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            count_block_calls(body)
                + catches
                    .iter()
                    .map(|c| count_block_calls(&c.body))
                    .sum::<usize>()
                + finally.as_ref().map_or(0, count_block_calls)
        }
        Stmt::Return(Some(e)) => count_expr_calls(e),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => 0,
        Stmt::Scope(block) => count_block_calls(block),
    }
}

fn count_expr_calls(expr: &Expr) -> usize {
    match expr {
        Expr::Variable(_) | Expr::Literal(_) | Expr::ClassRef(_) => 0,
        Expr::Binary { left, right, .. } => count_expr_calls(left) + count_expr_calls(right),
        Expr::Unary { operand, .. } => count_expr_calls(operand),
        Expr::Assign { target, value } => count_expr_calls(target) + count_expr_calls(value),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            count_expr_calls(condition)
                + then_branch.as_deref().map_or(0, count_expr_calls)
                + count_expr_calls(else_branch)
        }
        Expr::Call { args, .. } => 1 + args.iter().map(count_expr_calls).sum::<usize>(),
        Expr::MethodCall { receiver, args, .. } => {
            1 + count_expr_calls(receiver) + args.iter().map(count_expr_calls).sum::<usize>()
        }
        Expr::StaticCall { args, .. } => 1 + args.iter().map(count_expr_calls).sum::<usize>(),
        Expr::New { args, .. } => args.iter().map(count_expr_calls).sum::<usize>(),
        Expr::PropertyFetch { receiver, .. } => count_expr_calls(receiver),
        Expr::InstanceOf { expr, .. } => count_expr_calls(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stmt::{Block, Expr, Stmt};

    #[test]
    fn test_namespace_dedup() {
        let mut project = Project::new();
        let a = project.add_namespace("app");
        let b = project.add_namespace("app");
        assert_eq!(a, b);
        assert_eq!(project.namespaces().count(), 1);
    }

    #[test]
    fn test_placeholder_types_are_not_user_defined() {
        let mut project = Project::new();
        let t = project.placeholder_type("RuntimeException");
        assert!(!project.type_def(t).user_defined);
        assert_eq!(
            project.namespace(project.type_def(t).namespace).name,
            GLOBAL_NAMESPACE
        );
        // repeated lookups resolve to the same placeholder
        assert_eq!(project.placeholder_type("RuntimeException"), t);
    }

    #[test]
    fn test_interface_methods_have_no_body() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let iface = project.add_interface(ns, "Runner");
        let method = project.add_method(iface, "run");
        assert!(!project.callable(method).has_body());
        assert!(project.callable(method).is_abstract());
    }

    #[test]
    fn test_type_dependencies_deduplicate() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let a = project.add_class(ns, "A");
        let b = project.add_class(ns, "B");
        let m = project.add_method(a, "make");
        project.set_return_type(m, b);
        project.set_body(
            m,
            Block::new(vec![Stmt::Return(Some(Expr::new_object(b, vec![])))]),
        );
        let deps = project.type_dependencies(a);
        assert_eq!(deps.len(), 1);
        assert!(deps.contains(&b));
    }

    #[test]
    fn test_fingerprint_tracks_body_changes() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "compute");
        let before = project.callable_fingerprint(f);
        project.set_body(f, Block::new(vec![Stmt::Return(Some(Expr::int(1)))]));
        let after = project.callable_fingerprint(f);
        assert_ne!(before, after);
        // unchanged body keeps the fingerprint stable
        assert_eq!(after, project.callable_fingerprint(f));
    }

    #[test]
    fn test_layout_fingerprint_tracks_spans_and_comments() {
        let mut project = Project::new();
        let unit = project.add_unit(Some(std::path::PathBuf::from("src/a.code")), 20);
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "compute");
        project.set_callable_location(f, unit, SourceSpan::new(1, 10));

        let content = project.callable_fingerprint(f);
        let layout = project.callable_layout_fingerprint(f);
        project.add_comment(unit, SourceSpan::new(2, 4));

        // a new comment leaves the content untouched but changes the layout
        assert_eq!(content, project.callable_fingerprint(f));
        assert_ne!(layout, project.callable_layout_fingerprint(f));
    }

    #[test]
    fn test_call_count() {
        let mut project = Project::new();
        let ns = project.add_namespace("app");
        let f = project.add_function(ns, "driver");
        project.set_body(
            f,
            Block::new(vec![
                Stmt::Expr(Expr::call("alpha", vec![Expr::call("beta", vec![])])),
                Stmt::Return(Some(Expr::call("gamma", vec![]))),
            ]),
        );
        assert_eq!(project.call_count(f), 3);
    }
}
