//! AST (abstract syntax tree) types for the PLC language.
//!
//! Resolution results (variable, function, and type bindings) are not stored
//! on the nodes themselves. Instead the parser stamps every node that owns a
//! resolution slot with a [`NodeId`], and the analyzer publishes side tables
//! keyed by those ids.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

/// Identity of an AST node, assigned by the parser from a running counter.
///
/// Ids are unique within one parse; they carry no meaning beyond keying the
/// analyzer's side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Literal payloads. Integers and decimals are arbitrary precision; the
/// analyzer enforces the i32 / finite-double range rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

/// Binary operators, one variant per source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// The source spelling of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    /// Maps a source lexeme to its operator, if it names one.
    pub fn from_str(s: &str) -> Option<Self> {
        let op = match s {
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "^" => BinaryOp::Pow,
            _ => return None,
        };
        Some(op)
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expressions. Every variant owns a resolution slot and therefore an id:
/// the analyzer binds a type to each expression, a variable to each
/// `Access`, and a function to each `Call`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        id: NodeId,
        value: Literal,
    },
    Group {
        id: NodeId,
        inner: Box<Expression>,
    },
    Binary {
        id: NodeId,
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A variable read; an offset makes it a list element read.
    Access {
        id: NodeId,
        name: String,
        offset: Option<Box<Expression>>,
    },
    Call {
        id: NodeId,
        name: String,
        args: Vec<Expression>,
    },
    /// A list constructor, only produced by `LIST` global initializers.
    List {
        id: NodeId,
        elements: Vec<Expression>,
    },
}

impl Expression {
    /// The id of this node.
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Literal { id, .. }
            | Expression::Group { id, .. }
            | Expression::Binary { id, .. }
            | Expression::Access { id, .. }
            | Expression::Call { id, .. }
            | Expression::List { id, .. } => *id,
        }
    }
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An expression evaluated for its effect; the analyzer requires it to
    /// be a call.
    Expression(Expression),
    Declaration {
        id: NodeId,
        name: String,
        type_name: Option<String>,
        value: Option<Expression>,
    },
    Assignment {
        receiver: Expression,
        value: Expression,
    },
    If {
        condition: Expression,
        then_block: Vec<Statement>,
        else_block: Vec<Statement>,
    },
    Switch {
        condition: Expression,
        cases: Vec<Case>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    Return(Expression),
}

/// One arm of a `SWITCH`; a missing value marks the default case.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Option<Expression>,
    pub body: Vec<Statement>,
}

/// A function parameter with its declared type name.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// A global declaration (`LIST`, `VAR`, or `VAL`).
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub id: NodeId,
    pub name: String,
    pub type_name: String,
    pub mutable: bool,
    pub value: Option<Expression>,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: NodeId,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type_name: Option<String>,
    pub body: Vec<Statement>,
}

/// A whole program: globals first, then functions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}
