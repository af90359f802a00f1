//! Forbidden construct check for expanded modules
//!
//! A best-effort lexical check: comments are stripped first so that a
//! mention of `eval(` in a comment is not flagged, but string literals are
//! not recognised.
//!
//! # Usage
//!
//! ```
//! use macro_core::validator::Validator;
//!
//! let validator = Validator::default();
//! assert!(validator.validate("var x = 1;", "init.js").is_ok());
//! assert!(validator.validate("eval ('1')", "init.js").is_err());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{MacroError, Result};

// =============================================================================
// COMMENT STRIPPING
// =============================================================================

static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//.*\n").unwrap());

static BLOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static TRAILING_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\n+").unwrap());

/// Remove `//` and `/* */` comments and whitespace before line ends
///
/// A `//` comment on the last line is only removed when followed by a
/// newline.
pub fn strip_comments(text: &str) -> String {
    let text = LINE_COMMENT_RE.replace_all(text, "\n");
    let text = BLOCK_COMMENT_RE.replace_all(&text, "");
    TRAILING_SPACE_RE.replace_all(&text, "\n").into_owned()
}

// =============================================================================
// FORBIDDEN CONSTRUCTS
// =============================================================================

/// One disallowed pattern and the message reported when it matches
#[derive(Debug, Clone)]
pub struct ForbiddenConstruct {
    pattern: Regex,
    message: String,
}

impl ForbiddenConstruct {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Patterns rejected when no others are configured
pub const DEFAULT_FORBIDDEN: [(&str, &str); 2] = [
    (r"\beval\s*\(", "Eval disallowed in natives"),
    (r"\bwith\s*\(", "With statements disallowed in natives"),
];

/// Checks expanded module text against a list of forbidden constructs
#[derive(Debug, Clone)]
pub struct Validator {
    forbidden: Vec<ForbiddenConstruct>,
}

impl Default for Validator {
    fn default() -> Self {
        let forbidden = DEFAULT_FORBIDDEN
            .iter()
            .map(|(pattern, message)| ForbiddenConstruct {
                pattern: Regex::new(pattern).unwrap(),
                message: message.to_string(),
            })
            .collect();
        Self { forbidden }
    }
}

impl Validator {
    /// Build a validator from `(pattern, message)` pairs
    pub fn from_rules<'a, I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let forbidden = rules
            .into_iter()
            .map(|(pattern, message)| ForbiddenConstruct::new(pattern, message))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { forbidden })
    }

    pub fn forbidden(&self) -> &[ForbiddenConstruct] {
        &self.forbidden
    }

    /// Fail with the first construct found in `text`, naming `file`
    pub fn validate(&self, text: &str, file: &str) -> Result<()> {
        let stripped = strip_comments(text);

        for construct in &self.forbidden {
            if construct.pattern.is_match(&stripped) {
                debug!("{} matched /{}/", file, construct.pattern());
                return Err(MacroError::Validation {
                    file: file.to_string(),
                    message: construct.message.clone(),
                });
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_is_rejected() {
        let err = Validator::default()
            .validate("var f = eval('1 + 1');", "math.js")
            .unwrap_err();
        assert_eq!(err.to_string(), "Eval disallowed in natives: math.js");
    }

    #[test]
    fn test_with_is_rejected() {
        let err = Validator::default()
            .validate("with (obj) { x = 1; }", "scope.js")
            .unwrap_err();
        assert_eq!(err.to_string(), "With statements disallowed in natives: scope.js");
    }

    #[test]
    fn test_word_boundary_and_comments() {
        let validator = Validator::default();
        assert!(validator.validate("obj.doeval(x); startwith(y);", "a.js").is_ok());
        assert!(validator.validate("// eval(x)\nvar y;", "a.js").is_ok());
        assert!(validator.validate("/* with (o) */ var y;", "a.js").is_ok());
        // property access still looks like a call
        assert!(validator.validate("obj.eval(x);", "a.js").is_err());
    }

    #[test]
    fn test_custom_rules() {
        let validator = Validator::from_rules([(r"\bdebugger\b", "Debugger statements disallowed")])
            .unwrap();
        assert!(validator.validate("eval(1)", "a.js").is_ok());
        let err = validator.validate("debugger;", "b.js").unwrap_err();
        assert_eq!(err.to_string(), "Debugger statements disallowed: b.js");
    }

    #[test]
    fn test_invalid_rule_pattern() {
        let err = Validator::from_rules([("(", "broken")]).unwrap_err();
        assert!(matches!(err, MacroError::Pattern(_)));
    }

    #[test]
    fn test_strip_comments() {
        let text = "var a = 1; // one\n/* block\n comment */var b = 2;   \n\n\nvar c;";
        assert_eq!(strip_comments(text), "var a = 1;\nvar b = 2;\nvar c;");
    }
}
