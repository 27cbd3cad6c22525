use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of a resolvable expression node. The resolver's side-table is
/// keyed on these instead of node addresses.
pub type ExprId = usize;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Ids are process-unique, not per-parse: successive REPL lines share the
/// interpreter's resolution table.
pub fn next_expr_id() -> ExprId {
    NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed)
}

/// A literal as it appears in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Parameter list and body shared between a declaration site and every
/// runtime closure created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),

    // A reference to a named binding.
    Variable {
        id: ExprId,
        name: Token,
    },

    // Assignment to an existing name.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Grouping(Box<Expr>),

    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    // 'and' / 'or', short-circuiting.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    // cond ? if_true : if_false
    Ternary {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    Get {
        object: Box<Expr>,
        name: Token,
    },

    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    // Anonymous function expression.
    Function(Rc<FunctionDecl>),
}

/// A method declaration inside a class body. `is_class` marks static
/// methods, looked up on the class itself rather than on instances.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: Token,
    pub function: Rc<FunctionDecl>,
    pub is_class: bool,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Break(Token),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    // Named function declaration.
    Function {
        name: Token,
        function: Rc<FunctionDecl>,
    },

    Class {
        name: Token,
        // Always an Expr::Variable when present.
        superclass: Option<Expr>,
        methods: Vec<Method>,
    },
}
