//! Error types for definition parsing, expansion and validation

use thiserror::Error;

use crate::expr::EvalError;

/// Errors raised by the macro core
///
/// All of these are fatal for the module (or definitions file) being
/// processed; there is no partial-success mode.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MacroError {
    #[error("Illegal line {line_number}: {line} ({reason})")]
    DefinitionSyntax {
        line_number: usize,
        line: String,
        reason: String,
    },

    #[error("{message}: {file}")]
    Validation { file: String, message: String },

    #[error("Macro {name} expects {expected} argument(s), found {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Recursive expansion of macro {name} (active: {})", .chain.join(" -> "))]
    RecursiveExpansion { name: String, chain: Vec<String> },

    #[error("Unterminated invocation of macro {name} at offset {offset}")]
    UnterminatedInvocation { name: String, offset: usize },

    #[error("Computed macro {name} failed: {source}")]
    Evaluation {
        name: String,
        #[source]
        source: EvalError,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(String),
}

impl From<regex::Error> for MacroError {
    fn from(err: regex::Error) -> Self {
        MacroError::Pattern(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MacroError>;
