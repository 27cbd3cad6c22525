//! Static resolution pass for the Lox interpreter.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: a stack of maps tracking declared and fully
//!    defined names per block, function body, or class body.
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside functions, value
//!    returns from initializers, `break` outside loops, `this`/`super`
//!    misuse, self-inheritance, and unused locals.
//! 3. **Records binding distances**: every variable occurrence that lands in
//!    a local scope is reported to the interpreter as `(expression id,
//!    depth)`, enabling lookups that climb exactly the right number of
//!    environment frames. Names that match no scope are globals and get no
//!    entry.
//!
//! Diagnostics go through the shared [`Reporter`]; the pass reports and
//! keeps walking rather than aborting, so one mistake does not hide the
//! next.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Method, Stmt};
use crate::error::Reporter;
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Are we inside a user function? Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Per-name scope entry. `token` is absent only for the implicit
/// `this`/`super` bindings, which are seeded as used so teardown never
/// flags them.
#[derive(Debug)]
struct LocalVariable {
    token: Option<Token>,
    defined: bool,
    used: bool,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    reporter: &'a mut Reporter,
    scopes: Vec<HashMap<String, LocalVariable>>,
    current_function: FunctionType,
    current_class: ClassType,
    in_loop: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter, reporter: &'a mut Reporter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            reporter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_loop: false,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::Var { name, initializer } => {
                // Declared first so the initializer can be diagnosed for
                // reading the name it is about to define.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for statement in statements {
                    self.resolve_stmt(statement);
                }

                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                let enclosing_loop = self.in_loop;
                self.in_loop = true;
                self.resolve_stmt(body);
                self.in_loop = enclosing_loop;
            }

            Stmt::Break(token) => {
                if !self.in_loop {
                    self.reporter.error_at(token, "Break outside a loop.");
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.reporter
                        .error_at(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.reporter
                            .error_at(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Function { name, function } => {
                self.declare(name);
                self.define(name);

                self.resolve_function(function, FunctionType::Function);
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Method]) {
        self.declare(name);
        self.define(name);

        if let Some(expr) = superclass {
            if let Expr::Variable {
                name: superclass_name,
                ..
            } = expr
            {
                if superclass_name.lexeme == name.lexeme {
                    self.reporter
                        .error_at(superclass_name, "A class can't inherit from itself.");
                }
            }

            self.resolve_expr(expr);
        }

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        if superclass.is_some() {
            self.current_class = ClassType::Subclass;

            self.begin_scope();
            self.insert_implicit("super");
        }

        self.begin_scope();
        self.insert_implicit("this");

        for method in methods {
            let kind = if !method.is_class && method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(&method.function, kind);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(if_true);
                self.resolve_expr(if_false);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if let Some(variable) = scope.get(&name.lexeme) {
                        if !variable.defined {
                            self.reporter.error_at(
                                name,
                                "Can't read local variable in its own initializer.",
                            );
                        }
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.reporter
                        .error_at(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                if self.current_class == ClassType::None {
                    self.reporter
                        .error_at(keyword, "Can't use 'super' outside of a class.");
                } else if self.current_class != ClassType::Subclass {
                    self.reporter
                        .error_at(keyword, "Can't use 'super' in a class with no superclass.");
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Function(function) => {
                self.resolve_function(function, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body. `break`
    /// cannot cross a call boundary, so the loop flag is cleared inside.
    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop = self.in_loop;

        self.current_function = kind;
        self.in_loop = false;

        self.begin_scope();

        for param in &function.params {
            self.declare(param);
            self.define(param);
        }

        for statement in &function.body {
            self.resolve_stmt(statement);
        }

        self.end_scope();

        self.in_loop = enclosing_loop;
        self.current_function = enclosing_function;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, flagging locals nothing ever read.
    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for variable in scope.values() {
                if !variable.used {
                    if let Some(token) = &variable.token {
                        self.reporter.error_at(token, "Unused local variable.");
                    }
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            // Top level: globals are late-bound, nothing to track.
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.reporter
                .error_at(name, "Already a variable with this name in this scope.");
        }

        scope.insert(
            name.lexeme.clone(),
            LocalVariable {
                token: Some(name.clone()),
                defined: false,
                used: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(variable) = scope.get_mut(&name.lexeme) {
                variable.defined = true;
            }
        }
    }

    /// Seed an implicit binding (`this`/`super`) into the scope just opened.
    fn insert_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                LocalVariable {
                    token: None,
                    defined: true,
                    used: true,
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the first enclosing
    /// scope containing the name, or leave it global if none does.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(variable) = scope.get_mut(&name.lexeme) {
                variable.used = true;

                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
