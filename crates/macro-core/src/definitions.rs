//! Constant and macro tables
//!
//! Built once from the definitions file and immutable afterwards.
//! Declaration order is preserved in both tables: constants are matched
//! first-declared-wins, macros are expanded latest-declared first.

use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::macros::Macro;

/// `const NAME = value;`
#[derive(Debug, Clone)]
pub struct ConstantEntry {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl ConstantEntry {
    pub fn new(name: impl Into<String>, replacement: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))?;
        Ok(Self {
            name,
            pattern,
            replacement: replacement.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Word-boundary matcher for the constant name
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// `macro NAME(params) = body;` or `python macro NAME(params) = expr;`
#[derive(Debug, Clone)]
pub struct MacroEntry {
    name: String,
    invocation: Regex,
    body: Macro,
}

impl MacroEntry {
    pub fn new(name: impl Into<String>, body: Macro) -> Result<Self> {
        let name = name.into();
        let invocation = Regex::new(&format!(r"\b{}\(", regex::escape(&name)))?;
        Ok(Self {
            name,
            invocation,
            body,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matcher for `NAME(` at a word boundary
    pub fn invocation(&self) -> &Regex {
        &self.invocation
    }

    pub fn body(&self) -> &Macro {
        &self.body
    }
}

/// Kind of a definition line, for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Constant,
    Macro,
    ComputedMacro,
}

/// Serializable view of one definition
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionSummary {
    pub kind: DefinitionKind,
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
}

/// The constant table and the macro table
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    constants: Vec<ConstantEntry>,
    macros: Vec<MacroEntry>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_constant(&mut self, entry: ConstantEntry) {
        self.constants.push(entry);
    }

    pub fn push_macro(&mut self, entry: MacroEntry) {
        self.macros.push(entry);
    }

    pub fn constants(&self) -> &[ConstantEntry] {
        &self.constants
    }

    pub fn macros(&self) -> &[MacroEntry] {
        &self.macros
    }

    pub fn len(&self) -> usize {
        self.constants.len() + self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.macros.is_empty()
    }

    /// All definitions in declaration order, constants first
    pub fn summary(&self) -> Vec<DefinitionSummary> {
        let constants = self.constants.iter().map(|c| DefinitionSummary {
            kind: DefinitionKind::Constant,
            name: c.name.clone(),
            params: Vec::new(),
            body: c.replacement.clone(),
        });
        let macros = self.macros.iter().map(|m| DefinitionSummary {
            kind: match m.body {
                Macro::Template(_) => DefinitionKind::Macro,
                Macro::Computed(_) => DefinitionKind::ComputedMacro,
            },
            name: m.name.clone(),
            params: m.body.params().to_vec(),
            body: m.body.source().to_string(),
        });
        constants.chain(macros).collect()
    }
}
