//! Expression evaluation
//!
//! Integer arithmetic follows the conventions macro authors expect from the
//! historical tool: `/` and `//` on integers floor, `%` takes the sign of the
//! divisor, `and`/`or` return one of their operands.

use std::cmp::Ordering;

use super::{BinaryOp, Env, EvalError, Expr, UnaryOp, Value};

/// Evaluate an expression against parameter bindings
pub fn evaluate(expr: &Expr, env: &Env<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Name(name) => env
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| EvalError::UnknownName(name.clone())),
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, env)?),
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            if lhs.is_truthy() {
                evaluate(rhs, env)
            } else {
                Ok(lhs)
            }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let lhs = evaluate(lhs, env)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(rhs, env)
            }
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, evaluate(lhs, env)?, evaluate(rhs, env)?),
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if evaluate(cond, env)?.is_truthy() {
                evaluate(then, env)
            } else {
                evaluate(otherwise, env)
            }
        }
        Expr::Index(target, index) => index_value(evaluate(target, env)?, evaluate(index, env)?),
        Expr::Call(function, args) => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(function, args)
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

fn unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (op, v) => Err(EvalError::UnsupportedOperand {
            op: if op == UnaryOp::Neg { "-" } else { "+" },
            operand: v.type_name(),
        }),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(op, &lhs, &rhs)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        _ => arithmetic(op, lhs, rhs),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinaryOp::Mul, Value::Str(s), Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), Value::Str(s)) => {
            repeat(&s, n).map(Value::Str)
        }
        (op, Value::Int(a), Value::Int(b)) => int_arithmetic(op, a, b).map(Value::Int),
        (op, lhs, rhs) => match (as_float(&lhs), as_float(&rhs)) {
            (Some(a), Some(b)) => float_arithmetic(op, a, b).map(Value::Float),
            _ => Err(EvalError::UnsupportedOperands {
                op: op.symbol(),
                left: lhs.type_name(),
                right: rhs.type_name(),
            }),
        },
    }
}

/// Longest string a computed macro may produce by repetition
const MAX_REPEAT_LEN: usize = 1 << 24;

fn repeat(s: &str, count: i64) -> Result<String, EvalError> {
    let count = usize::try_from(count.max(0)).map_err(|_| EvalError::Overflow)?;
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_REPEAT_LEN => Ok(s.repeat(count)),
        _ => Err(EvalError::Overflow),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b)
                .map(|r| if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        _ => None,
    };
    result.ok_or(EvalError::Overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            Err(EvalError::DivisionByZero)
        }
        BinaryOp::Div => Ok(a / b),
        BinaryOp::FloorDiv => Ok((a / b).floor()),
        BinaryOp::Mod => {
            let r = a % b;
            Ok(if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            })
        }
        _ => Err(EvalError::UnsupportedOperands {
            op: op.symbol(),
            left: "float",
            right: "float",
        }),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        _ => match (as_float(lhs), as_float(rhs)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Ordering, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => match (as_float(lhs), as_float(rhs)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or(EvalError::UnsupportedOperands {
        op: op.symbol(),
        left: lhs.type_name(),
        right: rhs.type_name(),
    })
}

fn index_value(target: Value, index: Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len();
            let position = if i < 0 { i + len as i64 } else { i };
            if position < 0 || position >= len as i64 {
                return Err(EvalError::IndexOutOfRange { index: i, len });
            }
            Ok(Value::Str(chars[position as usize].to_string()))
        }
        (target, index) => Err(EvalError::UnsupportedOperands {
            op: "[]",
            left: target.type_name(),
            right: index.type_name(),
        }),
    }
}

// ============================================================================
// Built-ins
// ============================================================================

fn call(function: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match function {
        "len" => {
            let [arg] = exactly::<1>("len", args)?;
            match arg {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(EvalError::UnsupportedOperand {
                    op: "len()",
                    operand: other.type_name(),
                }),
            }
        }
        "ord" => {
            let [arg] = exactly::<1>("ord", args)?;
            match arg {
                Value::Str(s) if s.chars().count() == 1 => {
                    Ok(Value::Int(s.chars().next().map_or(0, |c| c as i64)))
                }
                other => Err(EvalError::InvalidConversion {
                    function: "ord",
                    value: other.to_string(),
                }),
            }
        }
        "chr" => {
            let [arg] = exactly::<1>("chr", args)?;
            match arg {
                Value::Int(i) => u32::try_from(i)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or(EvalError::InvalidConversion {
                        function: "chr",
                        value: i.to_string(),
                    }),
                other => Err(EvalError::UnsupportedOperand {
                    op: "chr()",
                    operand: other.type_name(),
                }),
            }
        }
        "str" => {
            let [arg] = exactly::<1>("str", args)?;
            Ok(Value::Str(arg.to_string()))
        }
        "int" => {
            let [arg] = exactly::<1>("int", args)?;
            match arg {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) if f.is_finite() => float_to_int(f).map(Value::Int),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                other => other
                    .to_string()
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| EvalError::InvalidConversion {
                        function: "int",
                        value: other.to_string(),
                    }),
            }
        }
        "float" => {
            let [arg] = exactly::<1>("float", args)?;
            match as_float(&arg) {
                Some(f) => Ok(Value::Float(f)),
                None => arg
                    .to_string()
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| EvalError::InvalidConversion {
                        function: "float",
                        value: arg.to_string(),
                    }),
            }
        }
        "abs" => {
            let [arg] = exactly::<1>("abs", args)?;
            match arg {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(EvalError::UnsupportedOperand {
                    op: "abs()",
                    operand: other.type_name(),
                }),
            }
        }
        "min" => extremum("min", args, Ordering::Less),
        "max" => extremum("max", args, Ordering::Greater),
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

/// Truncate toward zero; values outside `i64` are an overflow, not a clamp
fn float_to_int(f: f64) -> Result<i64, EvalError> {
    let t = f.trunc();
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Ok(t as i64)
    } else {
        Err(EvalError::Overflow)
    }
}

fn exactly<const N: usize>(function: &'static str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let found = args.len();
    args.try_into().map_err(|_| EvalError::BuiltinArity {
        function,
        expected: match N {
            1 => "1",
            2 => "2",
            _ => "a fixed number of",
        },
        found,
    })
}

fn extremum(function: &'static str, args: Vec<Value>, keep: Ordering) -> Result<Value, EvalError> {
    let mut iter = args.into_iter();
    let mut best = iter.next().ok_or(EvalError::BuiltinArity {
        function,
        expected: "at least 1",
        found: 0,
    })?;
    for candidate in iter {
        if compare(BinaryOp::Lt, &candidate, &best)? == keep {
            best = candidate;
        }
    }
    Ok(best)
}
