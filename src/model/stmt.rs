//! Statement and expression trees for callable bodies.
//!
//! The complexity analyzers consume these sum types; the closed node-kind
//! set keeps traversal a plain `match` instead of virtual dispatch.

use serde::{Deserialize, Serialize};

use crate::model::TypeId;

/// An ordered sequence of statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The statements in source order
    pub statements: Vec<Stmt>,
}

impl Block {
    /// Create a block from a list of statements.
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// Create an empty block.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<Vec<Stmt>> for Block {
    fn from(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

/// A statement within a callable body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// An expression statement
    Expr(Expr),
    /// An `if` statement with optional `elseif`/`else` continuation
    If {
        /// The controlling condition
        condition: Expr,
        /// The then branch
        then_branch: Block,
        /// The else continuation, if any
        else_branch: Option<ElseBranch>,
    },
    /// A `switch` statement
    Switch {
        /// The switch subject expression
        subject: Expr,
        /// The case list in source order
        cases: Vec<SwitchCase>,
    },
    /// A `while` loop
    While {
        /// The loop condition
        condition: Expr,
        /// The loop body
        body: Block,
    },
    /// A `do ... while` loop
    DoWhile {
        /// The loop body
        body: Block,
        /// The post-condition
        condition: Expr,
    },
    /// A counting `for` loop
    For {
        /// Initialization expression
        init: Option<Expr>,
        /// Continuation condition
        condition: Option<Expr>,
        /// Per-iteration update expression
        update: Option<Expr>,
        /// The loop body
        body: Block,
    },
    /// A `foreach` loop over a collection
    Foreach {
        /// The iterated expression
        subject: Expr,
        /// The loop body
        body: Block,
    },
    /// A `try` statement with catch clauses and optional finally block
    Try {
        /// The guarded body
        body: Block,
        /// Catch clauses in source order
        catches: Vec<CatchClause>,
        /// The finally block, if any
        finally: Option<Block>,
    },
    /// A `return` statement
    Return(Option<Expr>),
    /// A `throw` statement
    Throw(Expr),
    /// A `break` statement
    Break,
    /// A `continue` statement
    Continue,
    /// A nested brace scope
    Scope(Block),
}

/// The `else` continuation of an `if` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    /// A plain `else` block
    Else(Block),
    /// An `elseif` chain; the boxed statement is always [`Stmt::If`]
    ElseIf(Box<Stmt>),
}

/// One case of a `switch` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Whether this is the `default` case
    pub is_default: bool,
    /// The case body
    pub body: Block,
}

impl SwitchCase {
    /// A labeled (non-default) case.
    pub fn labeled(body: Block) -> Self {
        Self {
            is_default: false,
            body,
        }
    }

    /// The default case.
    pub fn default_case(body: Block) -> Self {
        Self {
            is_default: true,
            body,
        }
    }
}

/// One catch clause of a `try` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// The caught exception type, when resolved
    pub exception: Option<TypeId>,
    /// The handler body
    pub body: Block,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A variable reference
    Variable(String),
    /// A literal value
    Literal(Literal),
    /// A binary operation
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// A unary operation
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },
    /// An assignment
    Assign {
        /// Assignment target
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// A conditional (ternary) expression; a missing then-arm models the
    /// short `?:` form
    Ternary {
        /// The condition
        condition: Box<Expr>,
        /// The then arm, absent in the short form
        then_branch: Option<Box<Expr>>,
        /// The else arm
        else_branch: Box<Expr>,
    },
    /// A free function call
    Call {
        /// The called function name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
    },
    /// An instance method call
    MethodCall {
        /// Receiver expression
        receiver: Box<Expr>,
        /// Method name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
    },
    /// A static method call on a resolved type
    StaticCall {
        /// The receiving type
        class: TypeId,
        /// Method name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
    },
    /// Object instantiation
    New {
        /// The instantiated type
        class: TypeId,
        /// Constructor arguments
        args: Vec<Expr>,
    },
    /// A property fetch (`$obj->prop`)
    PropertyFetch {
        /// Receiver expression
        receiver: Box<Expr>,
        /// Property name
        name: String,
    },
    /// A bare static type reference (constant access, class-constant use)
    ClassRef(TypeId),
    /// An `instanceof` test
    InstanceOf {
        /// The tested expression
        expr: Box<Expr>,
        /// The type being tested against
        class: TypeId,
    },
}

impl Expr {
    /// A variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// An integer literal.
    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Int(value))
    }

    /// A string literal.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Literal(Literal::Str(value.into()))
    }

    /// A boolean literal.
    pub fn bool(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    /// A binary operation.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// A short-circuit `&&` expression.
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::BoolAnd, left, right)
    }

    /// A short-circuit `||` expression.
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::BoolOr, left, right)
    }

    /// An assignment of `value` to the named variable.
    pub fn assign_var(name: impl Into<String>, value: Expr) -> Self {
        Self::Assign {
            target: Box::new(Self::var(name)),
            value: Box::new(value),
        }
    }

    /// A free function call.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }

    /// Object instantiation.
    pub fn new_object(class: TypeId, args: Vec<Expr>) -> Self {
        Self::New { class, args }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// The null literal
    Null,
}

impl Literal {
    /// Render the literal as an operand token for Halstead counting.
    pub fn token(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Str(v) => format!("'{v}'"),
            Self::Bool(v) => v.to_string(),
            Self::Null => "null".to_string(),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// String concatenation
    Concat,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    Identical,
    /// `!==`
    NotIdentical,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// Short-circuit `&&`
    BoolAnd,
    /// Short-circuit `||`
    BoolOr,
    /// Keyword `and`
    LogicalAnd,
    /// Keyword `or`
    LogicalOr,
    /// Keyword `xor`
    LogicalXor,
}

impl BinaryOp {
    /// Whether this operator is a short-circuit boolean operator counted by
    /// the complexity analyzers. `xor` is deliberately excluded: it cannot
    /// short-circuit and adds no execution path.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            Self::BoolAnd | Self::BoolOr | Self::LogicalAnd | Self::LogicalOr
        )
    }

    /// The operator token for Halstead counting.
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Concat => ".",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Identical => "===",
            Self::NotIdentical => "!==",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::BoolAnd => "&&",
            Self::BoolOr => "||",
            Self::LogicalAnd => "and",
            Self::LogicalOr => "or",
            Self::LogicalXor => "xor",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// Unary `-`
    Neg,
    /// Unary `+`
    Plus,
    /// `~`
    BitNot,
}

impl UnaryOp {
    /// The operator token for Halstead counting.
    pub fn token(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-u",
            Self::Plus => "+u",
            Self::BitNot => "~",
        }
    }
}
