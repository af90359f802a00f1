//! C++ source emission
//!
//! All modules are concatenated into one `char` array; a `std::string`
//! array then lists, for each module, its id followed by a string built
//! from its slice of that buffer, terminated by an empty string.

use std::fmt::Write as _;

use thiserror::Error;

use crate::pipeline::ExpandedModule;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("Non-ASCII byte 0x{byte:02x} in module {module} at offset {offset}")]
    NonAscii {
        module: String,
        offset: usize,
        byte: u8,
    },
}

const HEADER: &str = "\
// This file was generated from .js source files by js2c. If you
// want to make changes to this file you should either change the
// javascript source files or the macro definitions.

#include <string>
";

/// Renders expanded modules as a C++ translation unit
#[derive(Debug, Clone, Copy)]
pub struct CppEmitter<'a> {
    namespace: &'a str,
    array_name: &'a str,
}

impl<'a> CppEmitter<'a> {
    pub fn new(namespace: &'a str, array_name: &'a str) -> Self {
        Self {
            namespace,
            array_name,
        }
    }

    pub fn render(&self, modules: &[ExpandedModule]) -> Result<String, EmitError> {
        check_ascii(modules)?;

        let data = modules
            .iter()
            .flat_map(|m| m.text.bytes())
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut declarations = String::new();
        let mut offset = 0;
        for module in modules {
            let len = module.text.len();
            write!(
                declarations,
                "std::string(\"{}\"), std::string(sources + {}, {}), ",
                escape_string(&module.id),
                offset,
                len
            )
            .unwrap();
            offset += len;
        }

        let mut out = String::with_capacity(HEADER.len() + data.len() + declarations.len() + 128);
        out.push_str(HEADER);
        write!(
            out,
            "\nnamespace {ns} {{\n\n\
             static const char sources[] = {{ {data} }};\n\
             std::string {array}[] = {{ {declarations}std::string() }};\n\n\
             }}  // namespace {ns}\n",
            ns = self.namespace,
            array = self.array_name,
        )
        .unwrap();
        Ok(out)
    }
}

fn check_ascii(modules: &[ExpandedModule]) -> Result<(), EmitError> {
    for module in modules {
        if let Some(offset) = module.text.bytes().position(|b| !b.is_ascii()) {
            return Err(EmitError::NonAscii {
                module: module.id.clone(),
                offset,
                byte: module.text.as_bytes()[offset],
            });
        }
    }
    Ok(())
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn module(id: &str, text: &str) -> ExpandedModule {
        ExpandedModule {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_render_layout() {
        let out = CppEmitter::new("adblock", "js_sources")
            .render(&[module("a.js", "ab"), module("b.js", "c")])
            .unwrap();

        let expected = format!(
            "{}\nnamespace adblock {{\n\n\
             static const char sources[] = {{ 97, 98, 99 }};\n\
             std::string js_sources[] = {{ std::string(\"a.js\"), std::string(sources + 0, 2), \
             std::string(\"b.js\"), std::string(sources + 2, 1), std::string() }};\n\n\
             }}  // namespace adblock\n",
            HEADER
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rejects_non_ascii() {
        let err = CppEmitter::new("adblock", "js_sources")
            .render(&[module("a.js", "ok"), module("b.js", "x = 'é';")])
            .unwrap_err();
        assert_eq!(
            err,
            EmitError::NonAscii {
                module: "b.js".to_string(),
                offset: 5,
                byte: 0xc3,
            }
        );
    }

    #[test]
    fn test_ids_are_escaped() {
        assert_eq!(escape_string(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
