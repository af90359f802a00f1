//! Restricted expression language for computed macros
//!
//! A `python macro` line carries a small expression over its parameters:
//!
//! ```text
//! python macro DOUBLE(n) = n * 2;
//! python macro CHAR_CODE(s) = ord(s[1]);
//! python macro PICK(a, b) = a if a > b else b;
//! ```
//!
//! The expression is parsed once when the definitions are loaded and
//! evaluated per invocation with the (already expanded) argument text bound
//! to each parameter. There is no general-purpose evaluator behind this:
//! only literals, parameters, operators and a fixed set of built-ins.
//!
//! ## Pipeline
//!
//! ```text
//! "n * 2"  →  parse_expression()  →  Expr::Binary(Mul, Name(n), Int(2))
//!                                          ↓
//!            Env { n → Value::Int(21) } → evaluate() → Value::Int(42) → "42"
//! ```

mod eval;
mod parser;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use eval::evaluate;
pub use parser::parse_expression;

// ============================================================================
// AST
// ============================================================================

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Reference to a macro parameter
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `then if cond else otherwise`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// Built-in function call
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Built-in functions callable from an expression
pub const BUILTINS: &[&str] = &[
    "len", "ord", "chr", "str", "int", "float", "abs", "min", "max",
];

/// Words that can never be parameter names inside an expression
pub(crate) const RESERVED: &[&str] = &["and", "or", "not", "if", "else", "True", "False"];

impl Expr {
    /// Check that every name refers to a parameter and every call to a built-in.
    ///
    /// Run once at definition time so that evaluation never meets an unbound name.
    pub fn check_names(&self, params: &[String]) -> Result<(), String> {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) => Ok(()),
            Expr::Name(name) => {
                if params.iter().any(|p| p == name) {
                    Ok(())
                } else {
                    Err(format!("unknown name '{}'", name))
                }
            }
            Expr::Unary(_, operand) => operand.check_names(params),
            Expr::Binary(_, lhs, rhs) | Expr::Index(lhs, rhs) => {
                lhs.check_names(params)?;
                rhs.check_names(params)
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.check_names(params)?;
                then.check_names(params)?;
                otherwise.check_names(params)
            }
            Expr::Call(function, args) => {
                if !BUILTINS.contains(&function.as_str()) {
                    return Err(format!("unknown function '{}'", function));
                }
                args.iter().try_for_each(|arg| arg.check_names(params))
            }
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// Interpret macro argument text.
    ///
    /// Integer-looking text becomes `Int`, other numeric text `Float`,
    /// everything else is kept verbatim as `Str`.
    pub fn from_argument(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if looks_numeric(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Str(text.to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

/// Digits with at most a sign, a decimal point and an exponent.
/// Keeps words like `inf` or `NaN` from being read as floats.
fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Parameter bindings for one evaluation
pub type Env<'a> = HashMap<&'a str, Value>;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while evaluating a computed macro
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unsupported operand types for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("bad operand type for unary {op}: '{operand}'")]
    UnsupportedOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), {found} given")]
    BuiltinArity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}() cannot convert '{value}'")]
    InvalidConversion {
        function: &'static str,
        value: String,
    },
}
