//! Constant and macro expansion
//!
//! Expansion runs in two phases over one module's text:
//!
//! 1. **Constants**: every whole-word occurrence of a constant name is
//!    replaced by its literal value in a single left-to-right pass. Replaced
//!    text is never scanned again.
//! 2. **Macros**: the macro table is walked from the last declaration to the
//!    first. Each invocation has its arguments expanded first, then the body
//!    is instantiated and the result is expanded again before it is spliced
//!    back into the text.
//!
//! Re-expanding the instantiated body is what allows a macro body to call a
//! macro declared after it. An active-macro stack is threaded through that
//! recursion so that self or mutual recursion fails instead of looping.

use tracing::{debug, trace};

use crate::definitions::{ConstantEntry, Definitions};
use crate::error::{MacroError, Result};
use crate::macros::ParamSubstitution;
use crate::scanner::scan_arguments;

/// Expands module text against one set of definitions
#[derive(Debug, Clone, Copy)]
pub struct Expander<'d> {
    definitions: &'d Definitions,
    substitution: ParamSubstitution,
}

impl<'d> Expander<'d> {
    pub fn new(definitions: &'d Definitions) -> Self {
        Self {
            definitions,
            substitution: ParamSubstitution::default(),
        }
    }

    /// Select how template parameters are substituted
    pub fn with_substitution(mut self, substitution: ParamSubstitution) -> Self {
        self.substitution = substitution;
        self
    }

    /// Constants, then macros
    pub fn expand(&self, text: &str) -> Result<String> {
        let text = self.expand_constants(text);
        self.expand_macros(&text)
    }

    pub fn expand_constants(&self, text: &str) -> String {
        expand_constants(text, self.definitions.constants())
    }

    pub fn expand_macros(&self, text: &str) -> Result<String> {
        let mut active = Vec::new();
        self.expand_macros_with(text, &mut active)
    }

    fn expand_macros_with(&self, text: &str, active: &mut Vec<&'d str>) -> Result<String> {
        let mut text = text.to_string();

        for entry in self.definitions.macros().iter().rev() {
            let name = entry.name();
            let mut search_from = 0;

            while let Some(found) = entry.invocation().find_at(&text, search_from) {
                let start = found.start();

                if active.contains(&name) {
                    let mut chain: Vec<String> = active.iter().map(|n| n.to_string()).collect();
                    chain.push(name.to_string());
                    return Err(MacroError::RecursiveExpansion {
                        name: name.to_string(),
                        chain,
                    });
                }

                let invocation = scan_arguments(&text, found.end()).ok_or_else(|| {
                    MacroError::UnterminatedInvocation {
                        name: name.to_string(),
                        offset: start,
                    }
                })?;
                let end = invocation.end;

                let expected = entry.body().params().len();
                if invocation.arguments.len() != expected {
                    return Err(MacroError::Arity {
                        name: name.to_string(),
                        expected,
                        found: invocation.arguments.len(),
                    });
                }

                let args = invocation
                    .arguments
                    .iter()
                    .map(|arg| self.expand_macros_with(arg, active))
                    .collect::<Result<Vec<_>>>()?;

                let instantiated = entry
                    .body()
                    .expand(&args, self.substitution)
                    .map_err(|source| MacroError::Evaluation {
                        name: name.to_string(),
                        source,
                    })?;

                active.push(name);
                let expansion = self.expand_macros_with(&instantiated, active);
                active.pop();
                let expansion = expansion?;

                trace!(
                    "Expanded {} at {}: {} bytes -> {} bytes",
                    name,
                    start,
                    end - start,
                    expansion.len()
                );

                text.replace_range(start..end, &expansion);
                search_from = start + expansion.len();
            }
        }

        Ok(text)
    }
}

/// Replace every whole-word constant name with its value
///
/// All entries are matched against the original text in one pass, so
/// replacement text is never rewritten by another constant. When two
/// entries match at the same offset, the one declared first wins.
pub fn expand_constants(text: &str, constants: &[ConstantEntry]) -> String {
    if constants.is_empty() {
        return text.to_string();
    }

    let next_match = |entry: &ConstantEntry, from: usize| {
        if entry.name().is_empty() {
            return None;
        }
        entry
            .pattern()
            .find_at(text, from)
            .map(|m| (m.start(), m.end()))
    };

    let mut pending: Vec<Option<(usize, usize)>> =
        constants.iter().map(|c| next_match(c, 0)).collect();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut replaced = 0usize;

    while let Some((start, index, end)) = pending
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.map(|(s, e)| (s, i, e)))
        .min()
    {
        out.push_str(&text[copied..start]);
        out.push_str(constants[index].replacement());
        copied = end;
        replaced += 1;

        for (entry, slot) in constants.iter().zip(pending.iter_mut()) {
            if matches!(slot, Some((s, _)) if *s < copied) {
                *slot = next_match(entry, copied);
            }
        }
    }

    out.push_str(&text[copied..]);
    debug!("Replaced {} constant occurrence(s)", replaced);
    out
}

/// Expand every macro invocation in `text` with default substitution
pub fn expand_macros(text: &str, definitions: &Definitions) -> Result<String> {
    Expander::new(definitions).expand_macros(text)
}
