//! The unit language.
//!
//! A unit file declares a package, the modules it imports, and one unit
//! with `const` declarations and an `invoke` block:
//!
//! ```text
//! package gen.reports
//! import text
//! unit monthly {
//!   const RATE = 3
//!   invoke {
//!     let x = ctx.amount * RATE
//!     set total = x
//!     return text.upper("done")
//!   }
//! }
//! ```
//!
//! Inside `invoke`, `ctx` is the execution context. `set` writes into it.

pub mod ast;
mod builtins;
mod check;
mod interp;
mod lexer;
mod parser;

use thiserror::Error;

pub use interp::{eval_consts, run, truthy};

/// A syntax or static-check error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// An error raised while evaluating consts or running a body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse and check unit source.
pub fn compile(source: &str) -> Result<ast::UnitDecl, CompileError> {
    let unit = parser::parse(source)?;
    check::check(&unit)?;
    Ok(unit)
}
