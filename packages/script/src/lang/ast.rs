//! Syntax tree for unit source.

use loadstone_entity::Value;

/// A parsed unit declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDecl {
    pub package: String,
    pub imports: Vec<Import>,
    pub name: String,
    pub consts: Vec<Const>,
    /// `None` when the unit declares no invoke block.
    pub invoke: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub name: String,
    pub value: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let(String, Expr),
    /// Write into the context at a dotted path.
    Set(String, Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call {
        module: Option<String>,
        function: String,
        args: Vec<Expr>,
        line: usize,
    },
}
