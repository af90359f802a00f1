//! Definitions file parser
//!
//! Each non-blank line of a definitions file declares one constant or one
//! macro:
//!
//! ```text
//! const NAME = value;                       # constant
//! macro NAME(a, b) = body using a and b;    # template macro
//! python macro NAME(n) = n * 2;             # computed macro
//! ```
//!
//! Everything after `#` is a comment. Values and bodies run up to the `;`
//! that ends the line and so cannot contain `;` (or `#`) themselves.

use std::collections::HashSet;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, eof},
    error::ParseError as NomParseError,
    IResult,
};
use tracing::{debug, warn};

use crate::definitions::{ConstantEntry, Definitions, MacroEntry};
use crate::error::{MacroError, Result};
use crate::macros::{ComputedMacro, Macro, TemplateMacro};

// ============================================================================
// Public API
// ============================================================================

/// One line of a definitions file, comment stripped and trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLine {
    /// 1-based line number in the original file
    pub number: usize,
    pub text: String,
}

/// Raw classification of a definition line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition<'a> {
    Constant {
        name: &'a str,
        value: &'a str,
    },
    Template {
        name: &'a str,
        params: &'a str,
        body: &'a str,
    },
    Computed {
        name: &'a str,
        params: &'a str,
        body: &'a str,
    },
}

/// Split a definitions file into meaningful lines
///
/// Strips `#` comments and surrounding whitespace, drops blank lines.
pub fn definition_lines(source: &str) -> Vec<DefinitionLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = match line.find('#') {
                Some(hash) => &line[..hash],
                None => line,
            };
            let line = line.trim();
            (!line.is_empty()).then(|| DefinitionLine {
                number: i + 1,
                text: line.to_string(),
            })
        })
        .collect()
}

/// Classify one (already trimmed) line
///
/// Grammars are tried in order: constant, template macro, computed macro.
pub fn parse_line(line: &str) -> std::result::Result<Definition<'_>, String> {
    match all_consuming(alt((
        constant::<nom::error::Error<&str>>,
        template,
        computed,
    )))(line)
    {
        Ok((_, definition)) => Ok(definition),
        Err(_) => Err("expected `const`, `macro` or `python macro` definition".to_string()),
    }
}

/// Build the constant and macro tables from definition lines
pub fn parse_definitions<'a, I>(lines: I) -> Result<Definitions>
where
    I: IntoIterator<Item = &'a DefinitionLine>,
{
    let mut definitions = Definitions::new();
    let mut constant_names = HashSet::new();
    let mut macro_names = HashSet::new();

    for line in lines {
        let syntax_error = |reason: String| MacroError::DefinitionSyntax {
            line_number: line.number,
            line: line.text.clone(),
            reason,
        };

        match parse_line(&line.text).map_err(syntax_error)? {
            Definition::Constant { name, value } => {
                if !constant_names.insert(name.to_string()) {
                    warn!(
                        "Constant {} redeclared on line {}; the first declaration wins",
                        name, line.number
                    );
                }
                definitions.push_constant(ConstantEntry::new(name, value)?);
            }
            Definition::Template { name, params, body } => {
                let params = split_params(params).map_err(syntax_error)?;
                if !macro_names.insert(name.to_string()) {
                    warn!(
                        "Macro {} redeclared on line {}; the later declaration wins",
                        name, line.number
                    );
                }
                let body = Macro::Template(TemplateMacro::new(params, body));
                definitions.push_macro(MacroEntry::new(name, body)?);
            }
            Definition::Computed { name, params, body } => {
                let params = split_params(params).map_err(syntax_error)?;
                let computed = ComputedMacro::compile(params, body).map_err(syntax_error)?;
                if !macro_names.insert(name.to_string()) {
                    warn!(
                        "Macro {} redeclared on line {}; the later declaration wins",
                        name, line.number
                    );
                }
                definitions.push_macro(MacroEntry::new(name, Macro::Computed(computed))?);
            }
        }
    }

    debug!(
        "Parsed {} constants and {} macros",
        definitions.constants().len(),
        definitions.macros().len()
    );

    Ok(definitions)
}

/// Parse a whole definitions file
pub fn parse_definitions_source(source: &str) -> Result<Definitions> {
    parse_definitions(&definition_lines(source))
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn name<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// `= text;` ending the line; returns the trimmed text
fn assignment_tail<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    let (input, _) = multispace0(input)?;
    let (input, _) = char('=')(input)?;
    let (input, text) = take_while(|c: char| c != ';')(input)?;
    let (input, _) = char(';')(input)?;
    let (input, _) = eof(input)?;
    Ok((input, text.trim()))
}

fn constant<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Definition<'a>, E> {
    let (input, _) = tag("const")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = name(input)?;
    let (input, value) = assignment_tail(input)?;
    Ok((input, Definition::Constant { name, value }))
}

/// `macro NAME(params)` shared by both macro flavours
fn signature<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (&'a str, &'a str), E> {
    let (input, _) = tag("macro")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = name(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, params) = take_while(|c: char| c != ')')(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, (name, params)))
}

fn template<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Definition<'a>, E> {
    let (input, (name, params)) = signature(input)?;
    let (input, body) = assignment_tail(input)?;
    Ok((input, Definition::Template { name, params, body }))
}

fn computed<'a, E: NomParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Definition<'a>, E> {
    let (input, _) = tag("python")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, (name, params)) = signature(input)?;
    let (input, body) = assignment_tail(input)?;
    Ok((input, Definition::Computed { name, params, body }))
}

/// Split `a, b, c` into trimmed, unique parameter names.
/// An empty list declares a zero-parameter macro.
fn split_params(params: &str) -> std::result::Result<Vec<String>, String> {
    if params.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    params
        .split(',')
        .map(|p| {
            let p = p.trim();
            if p.is_empty() {
                Err("empty parameter name".to_string())
            } else if !seen.insert(p) {
                Err(format!("duplicate parameter '{}'", p))
            } else {
                Ok(p.to_string())
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
