//! Macro bodies
//!
//! A macro body is either a text template or a computed expression. Both
//! expose the same capability: given one argument per declared parameter,
//! produce the replacement text for the invocation.

use serde::{Deserialize, Serialize};

use crate::expr::{evaluate, parse_expression, Env, EvalError, Expr, Value};

/// How template parameters are located inside a macro body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSubstitution {
    /// Plain substring replace, one parameter at a time in declaration order.
    ///
    /// A parameter named `a` is also replaced inside `data`, and a value
    /// substituted for one parameter can be rewritten again by a later one.
    #[default]
    Substring,
    /// Replace whole identifier tokens only, in a single pass.
    Token,
}

/// Ordered parameter → argument pairs for one invocation
pub type Bindings<'a> = Vec<(&'a str, &'a str)>;

/// Expansion strategy for a declared macro
#[derive(Debug, Clone, PartialEq)]
pub enum Macro {
    Template(TemplateMacro),
    Computed(ComputedMacro),
}

impl Macro {
    pub fn params(&self) -> &[String] {
        match self {
            Macro::Template(t) => &t.params,
            Macro::Computed(c) => &c.params,
        }
    }

    /// Body text as written in the definitions file
    pub fn source(&self) -> &str {
        match self {
            Macro::Template(t) => &t.body,
            Macro::Computed(c) => &c.source,
        }
    }

    /// Pair each declared parameter with its argument.
    ///
    /// Callers check arity first; surplus on either side is ignored here.
    pub fn bind<'a>(&'a self, args: &'a [String]) -> Bindings<'a> {
        self.params()
            .iter()
            .map(String::as_str)
            .zip(args.iter().map(String::as_str))
            .collect()
    }

    /// Produce the replacement text for one invocation
    pub fn expand(&self, args: &[String], mode: ParamSubstitution) -> Result<String, EvalError> {
        let bindings = self.bind(args);
        match self {
            Macro::Template(t) => Ok(t.expand(&bindings, mode)),
            Macro::Computed(c) => c.expand(&bindings),
        }
    }
}

// ============================================================================
// Template macros
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMacro {
    params: Vec<String>,
    body: String,
}

impl TemplateMacro {
    pub fn new(params: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            params,
            body: body.into(),
        }
    }

    pub fn expand(&self, bindings: &Bindings<'_>, mode: ParamSubstitution) -> String {
        match mode {
            ParamSubstitution::Substring => bindings
                .iter()
                .fold(self.body.clone(), |text, (param, value)| {
                    text.replace(param, value)
                }),
            ParamSubstitution::Token => substitute_tokens(&self.body, bindings),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn substitute_tokens(body: &str, bindings: &Bindings<'_>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(start) = rest.find(is_ident_char) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let len = tail.find(|c: char| !is_ident_char(c)).unwrap_or(tail.len());
        let token = &tail[..len];

        match bindings.iter().find(|(param, _)| *param == token) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(token),
        }
        rest = &tail[len..];
    }

    out.push_str(rest);
    out
}

// ============================================================================
// Computed macros
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedMacro {
    params: Vec<String>,
    source: String,
    expr: Expr,
}

impl ComputedMacro {
    /// Parse the expression and check it only refers to its parameters
    pub fn compile(params: Vec<String>, source: &str) -> Result<Self, String> {
        if let Some(bad) = params
            .iter()
            .find(|p| p.is_empty() || !p.chars().all(is_ident_char))
        {
            return Err(format!("parameter '{}' is not an identifier", bad));
        }

        let expr = parse_expression(source)?;
        expr.check_names(&params)?;

        Ok(Self {
            params,
            source: source.to_string(),
            expr,
        })
    }

    pub fn expand(&self, bindings: &Bindings<'_>) -> Result<String, EvalError> {
        let env: Env = bindings
            .iter()
            .map(|(param, value)| (*param, Value::from_argument(value)))
            .collect();
        evaluate(&self.expr, &env).map(|value| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_template_substring_substitution() {
        let m = Macro::Template(TemplateMacro::new(params(&["a", "b"]), "(a + b)"));
        let out = m.expand(&args(&["1", "2"]), ParamSubstitution::Substring).unwrap();
        assert_eq!(out, "(1 + 2)");
    }

    #[test]
    fn test_substring_mode_replaces_inside_identifiers() {
        let m = Macro::Template(TemplateMacro::new(params(&["a"]), "data.a"));
        let out = m.expand(&args(&["X"]), ParamSubstitution::Substring).unwrap();
        assert_eq!(out, "dXtX.X");
    }

    #[test]
    fn test_substring_mode_rewrites_earlier_values() {
        // "a" becomes "b", which the later parameter then replaces
        let m = Macro::Template(TemplateMacro::new(params(&["a", "b"]), "a+b"));
        let out = m.expand(&args(&["b", "1"]), ParamSubstitution::Substring).unwrap();
        assert_eq!(out, "1+1");
    }

    #[test]
    fn test_token_mode_respects_identifiers() {
        let m = Macro::Template(TemplateMacro::new(params(&["a", "b"]), "data.a + b"));
        let out = m.expand(&args(&["b", "1"]), ParamSubstitution::Token).unwrap();
        assert_eq!(out, "data.b + 1");
    }

    #[test]
    fn test_computed_macro() {
        let m = Macro::Computed(ComputedMacro::compile(params(&["n"]), "n * 2").unwrap());
        let out = m.expand(&args(&["21"]), ParamSubstitution::default()).unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn test_computed_macro_rejects_unknown_names() {
        let err = ComputedMacro::compile(params(&["n"]), "m * 2").unwrap_err();
        assert!(err.contains("unknown name 'm'"));

        let err = ComputedMacro::compile(params(&["a b"]), "1").unwrap_err();
        assert!(err.contains("not an identifier"));
    }

    #[test]
    fn test_bind_pairs_in_declaration_order() {
        let m = Macro::Template(TemplateMacro::new(params(&["x", "y"]), "x y"));
        let a = args(&["1", "2"]);
        assert_eq!(m.bind(&a), vec![("x", "1"), ("y", "2")]);
    }
}
