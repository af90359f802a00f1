//! macro-core: Definitions, expression language and expansion engine for js2c
//!
//! This crate contains the pure preprocessing logic with NO file I/O:
//! - Definitions file parser (constants, template macros, computed macros)
//! - Restricted expression language for computed macro bodies
//! - Invocation argument splitter
//! - Expansion engine with recursion guard
//! - Forbidden construct validator and comment stripping
//!
//! Reading files, configuration and C++ emission live in the `js2c` crate.

pub mod definitions;
pub mod error;
pub mod expander;
pub mod expr;
pub mod macros;
pub mod parser;
pub mod scanner;
pub mod validator;

// Re-export commonly used types
pub use definitions::{ConstantEntry, DefinitionKind, DefinitionSummary, Definitions, MacroEntry};
pub use error::{MacroError, Result};
pub use expander::{expand_constants, expand_macros, Expander};
pub use expr::{evaluate, parse_expression, EvalError, Expr, Value};
pub use macros::{ComputedMacro, Macro, ParamSubstitution, TemplateMacro};
pub use parser::{definition_lines, parse_definitions, parse_definitions_source, DefinitionLine};
pub use scanner::{scan_arguments, Invocation};
pub use validator::{strip_comments, ForbiddenConstruct, Validator, DEFAULT_FORBIDDEN};
