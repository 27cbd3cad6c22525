//! Error types and the diagnostic reporter for the **Lox interpreter**.
//!
//! Static diagnostics (scanner, parser, resolver) flow through [`Reporter`],
//! which prints them to standard error and records the `had_error` /
//! `had_runtime_error` flags the driver maps to exit codes. Runtime failures
//! are carried as a typed [`RuntimeError`] that unwinds the evaluator back to
//! the top-level entry point.

use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type for the scanner-facing and I/O paths.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Wrapper around `std::io::Error`. Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// What went wrong at runtime. The `#[error]` strings are the exact
/// diagnostics the evaluator emits.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Operand must be a number.")]
    UnaryOperandNotNumber,

    #[error("Left operand must be a number.")]
    LeftOperandNotNumber,

    #[error("Right operand must be a number.")]
    RightOperandNotNumber,

    #[error("Operands must be two numbers or one of them must be a string.")]
    AddOperands,

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },

    #[error("Only instances have properties.")]
    PropertyOnNonInstance,

    #[error("Only instances have fields.")]
    FieldOnNonInstance,

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Superclass must be a class.")]
    SuperclassNotClass,

    #[error("Cannot break outside of a loop.")]
    BreakOutsideLoop,
}

/// A runtime failure pinned to the offending token's line.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(line: usize, kind: RuntimeErrorKind) -> Self {
        info!("Creating runtime error: line={}, kind={}", line, kind);

        RuntimeError { kind, line }
    }
}

/// Collects diagnostics across the phases of a run.
///
/// Every compile-time diagnostic goes through [`Reporter::report`], which
/// writes `[line N] Error<where>: <message>` to standard error. Runtime
/// errors print as `<message>` followed by `[line N]`. The rendered text is
/// retained so tests can assert on it.
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: bool,
    had_runtime_error: bool,
    diagnostics: Vec<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Report an error identified only by line, e.g. from the scanner.
    pub fn error(&mut self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Report an error at a token, pointing at its lexeme (or at end).
    pub fn error_at(&mut self, token: &Token, message: &str) {
        if token.token_type == TokenType::EOF {
            self.report(token.line, " at end", message);
        } else {
            let location = format!(" at '{}'", token.lexeme);
            self.report(token.line, &location, message);
        }
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        let rendered = error.to_string();
        eprintln!("{rendered}");

        self.diagnostics.push(rendered);
        self.had_runtime_error = true;
    }

    fn report(&mut self, line: usize, location: &str, message: &str) {
        let rendered = format!("[line {line}] Error{location}: {message}");
        eprintln!("{rendered}");

        info!("Reported diagnostic: {}", rendered);

        self.diagnostics.push(rendered);
        self.had_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Rendered diagnostics, in emission order.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Forget compile errors between REPL lines. Runtime-error state
    /// persists for the session.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.diagnostics.clear();
    }
}
