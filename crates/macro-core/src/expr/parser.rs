//! Nom parser for computed-macro expressions
//!
//! Precedence, lowest first:
//!
//! ```text
//! conditional  :=  or_expr ("if" or_expr "else" conditional)?
//! or_expr      :=  and_expr ("or" and_expr)*
//! and_expr     :=  not_expr ("and" not_expr)*
//! not_expr     :=  "not" not_expr | comparison
//! comparison   :=  sum (("==" | "!=" | "<=" | ">=" | "<" | ">") sum)?
//! sum          :=  term (("+" | "-") term)*
//! term         :=  unary (("*" | "//" | "/" | "%") unary)*
//! unary        :=  ("-" | "+") unary | postfix
//! postfix      :=  atom ("[" conditional "]")*
//! atom         :=  number | string | "True" | "False" | "(" conditional ")"
//!               |  name | name "(" (conditional ("," conditional)*)? ")"
//! ```

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{
        alpha1, alphanumeric1, char, digit0, digit1, hex_digit1, multispace0, none_of, satisfy,
    },
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value, verify},
    error::{context, VerboseError},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{BinaryOp, Expr, UnaryOp, RESERVED};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete expression
pub fn parse_expression(input: &str) -> Result<Expr, String> {
    match all_consuming(delimited(multispace0, conditional, multispace0))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A reserved word not followed by further identifier characters
fn word<'a>(w: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag(w), not(satisfy(is_ident_char)))
}

fn keyword<'a>(w: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    ws(word(w))
}

fn boxed(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    Expr::Binary(op, Box::new(lhs), Box::new(rhs))
}

// ============================================================================
// Operators
// ============================================================================

fn conditional(input: &str) -> Res<'_, Expr> {
    let (input, then) = or_expr(input)?;
    let (input, rest) = opt(preceded(
        keyword("if"),
        cut(tuple((
            or_expr,
            context("'else' branch", keyword("else")),
            conditional,
        ))),
    ))(input)?;

    let expr = match rest {
        Some((cond, _, otherwise)) => Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        None => then,
    };
    Ok((input, expr))
}

fn or_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_expr))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| boxed(lhs, BinaryOp::Or, rhs)),
    ))
}

fn and_expr(input: &str) -> Res<'_, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(keyword("and"), not_expr))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| boxed(lhs, BinaryOp::And, rhs)),
    ))
}

fn not_expr(input: &str) -> Res<'_, Expr> {
    alt((
        map(preceded(keyword("not"), not_expr), |e| {
            Expr::Unary(UnaryOp::Not, Box::new(e))
        }),
        comparison,
    ))(input)
}

fn comparison_op(input: &str) -> Res<'_, BinaryOp> {
    ws(alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
    )))(input)
}

fn comparison(input: &str) -> Res<'_, Expr> {
    let (input, lhs) = sum(input)?;
    let (input, rhs) = opt(pair(comparison_op, sum))(input)?;
    Ok((
        input,
        match rhs {
            Some((op, rhs)) => boxed(lhs, op, rhs),
            None => lhs,
        },
    ))
}

fn sum(input: &str) -> Res<'_, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        ))),
        term,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, (op, rhs)| boxed(lhs, op, rhs)),
    ))
}

fn term(input: &str) -> Res<'_, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::FloorDiv, tag("//")),
            value(BinaryOp::Mul, tag("*")),
            value(BinaryOp::Div, tag("/")),
            value(BinaryOp::Mod, tag("%")),
        ))),
        unary,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, (op, rhs)| boxed(lhs, op, rhs)),
    ))
}

fn unary(input: &str) -> Res<'_, Expr> {
    ws(alt((
        map(preceded(char('-'), unary), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        map(preceded(char('+'), unary), |e| {
            Expr::Unary(UnaryOp::Plus, Box::new(e))
        }),
        postfix,
    )))(input)
}

fn postfix(input: &str) -> Res<'_, Expr> {
    let (input, target) = atom(input)?;
    let (input, indices) = many0(delimited(
        ws(char('[')),
        conditional,
        context("closing bracket", cut(ws(char(']')))),
    ))(input)?;
    Ok((
        input,
        indices
            .into_iter()
            .fold(target, |t, i| Expr::Index(Box::new(t), Box::new(i))),
    ))
}

// ============================================================================
// Atoms
// ============================================================================

fn atom(input: &str) -> Res<'_, Expr> {
    ws(alt((
        number,
        map(string_literal, Expr::Str),
        value(Expr::Bool(true), word("True")),
        value(Expr::Bool(false), word("False")),
        delimited(
            char('('),
            conditional,
            context("closing parenthesis", cut(char(')'))),
        ),
        call_or_name,
    )))(input)
}

fn number(input: &str) -> Res<'_, Expr> {
    alt((
        map_res(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: &str| i64::from_str_radix(digits, 16).map(Expr::Int),
        ),
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            |text: &str| -> Result<Expr, String> {
                if text.contains('.') {
                    text.parse::<f64>()
                        .map(Expr::Float)
                        .map_err(|e| e.to_string())
                } else {
                    text.parse::<i64>()
                        .map(Expr::Int)
                        .map_err(|e| e.to_string())
                }
            },
        ),
    ))(input)
}

fn string_literal(input: &str) -> Res<'_, String> {
    alt((quoted('"', "\"\\"), quoted('\'', "'\\")))(input)
}

fn quoted<'a>(quote: char, forbidden: &'static str) -> impl FnMut(&'a str) -> Res<'a, String> {
    move |input| {
        alt((
            value(String::new(), pair(char(quote), char(quote))),
            delimited(
                char(quote),
                escaped_transform(
                    none_of(forbidden),
                    '\\',
                    alt((
                        value('\n', char('n')),
                        value('\r', char('r')),
                        value('\t', char('t')),
                        value('\\', char('\\')),
                        value('"', char('"')),
                        value('\'', char('\'')),
                    )),
                ),
                context("closing quote", cut(char(quote))),
            ),
        ))(input)
    }
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn call_or_name(input: &str) -> Res<'_, Expr> {
    let (input, name) = verify(identifier, |name: &str| !RESERVED.contains(&name))(input)?;
    let (input, args) = opt(delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), conditional),
        context("closing parenthesis", cut(ws(char(')')))),
    ))(input)?;

    let expr = match args {
        Some(args) => Expr::Call(name.to_string(), args),
        None => Expr::Name(name.to_string()),
    };
    Ok((input, expr))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                name("a"),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    name("b"),
                    Box::new(Expr::Int(2))
                ))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expression("a - b - c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(BinaryOp::Sub, name("a"), name("b"))),
                name("c")
            )
        );
    }

    #[test]
    fn test_floor_division_is_not_two_divisions() {
        let expr = parse_expression("a // 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::FloorDiv, name("a"), Box::new(Expr::Int(2)))
        );
    }

    #[test]
    fn test_conditional() {
        let expr = parse_expression("a if a > b else b").unwrap();
        match expr {
            Expr::Conditional { cond, then, otherwise } => {
                assert_eq!(*cond, Expr::Binary(BinaryOp::Gt, name("a"), name("b")));
                assert_eq!(then, name("a"));
                assert_eq!(otherwise, name("b"));
            }
            other => panic!("Expected Conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_operators() {
        let expr = parse_expression("not a and b or c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Or,
                Box::new(Expr::Binary(
                    BinaryOp::And,
                    Box::new(Expr::Unary(UnaryOp::Not, name("a"))),
                    name("b")
                )),
                name("c")
            )
        );
    }

    #[test]
    fn test_keywords_are_not_prefixes() {
        // "order" starts with "or", "android" with "and"
        let expr = parse_expression("order + android").unwrap();
        assert_eq!(expr, Expr::Binary(BinaryOp::Add, name("order"), name("android")));
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expression("42").unwrap(), Expr::Int(42));
        assert_eq!(parse_expression("0x1F").unwrap(), Expr::Int(31));
        assert_eq!(parse_expression("1.5").unwrap(), Expr::Float(1.5));
        assert_eq!(parse_expression("True").unwrap(), Expr::Bool(true));
        assert_eq!(
            parse_expression(r#""a\nb""#).unwrap(),
            Expr::Str("a\nb".to_string())
        );
        assert_eq!(
            parse_expression("'it'").unwrap(),
            Expr::Str("it".to_string())
        );
        assert_eq!(parse_expression("''").unwrap(), Expr::Str(String::new()));
    }

    #[test]
    fn test_calls_and_indexing() {
        let expr = parse_expression("ord(s[1])").unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                "ord".to_string(),
                vec![Expr::Index(name("s"), Box::new(Expr::Int(1)))]
            )
        );

        let expr = parse_expression("max(a, b, 3)").unwrap();
        match expr {
            Expr::Call(f, args) => {
                assert_eq!(f, "max");
                assert_eq!(args.len(), 3);
            }
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            parse_expression("-n").unwrap(),
            Expr::Unary(UnaryOp::Neg, name("n"))
        );
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("(a + b").is_err());
        assert!(parse_expression("a if b").is_err());
        assert!(parse_expression("a ** b").is_err());
        assert!(parse_expression("'unclosed").is_err());
    }
}
