//! Invocation argument splitter
//!
//! Splits the argument list of `NAME(a, f(b, c), [d, e])` into
//! `["a", "f(b, c)", "[d, e]"]`: commas only separate arguments at the
//! outermost nesting level, where `()`, `[]` and `{}` all count as nesting.
//! Brackets are not matched against each other and string literals are not
//! recognised; a `,` or `)` inside a quoted string is treated like any other.

/// Arguments of one invocation, as slices of the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'t> {
    /// Trimmed argument spans in positional order
    pub arguments: Vec<&'t str>,
    /// Byte offset just past the closing `)`
    pub end: usize,
}

/// Scan the arguments of an invocation whose `NAME(` ends at `start`.
///
/// Returns `None` when the text ends before the closing parenthesis.
/// An argument list containing only whitespace yields no arguments.
pub fn scan_arguments(text: &str, start: usize) -> Option<Invocation<'_>> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut arg_start = start;
    let mut arguments = Vec::new();

    for (offset, byte) in bytes.iter().enumerate().skip(start) {
        match byte {
            b',' if depth == 1 => {
                arguments.push(text[arg_start..offset].trim());
                arg_start = offset + 1;
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    let last = text[arg_start..offset].trim();
                    if !(arguments.is_empty() && last.is_empty()) {
                        arguments.push(last);
                    }
                    return Some(Invocation {
                        arguments,
                        end: offset + 1,
                    });
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Option<Invocation<'_>> {
        let start = text.find('(').unwrap() + 1;
        scan_arguments(text, start)
    }

    #[test]
    fn test_simple_arguments() {
        let inv = scan("ADD(1, 2) + 3").unwrap();
        assert_eq!(inv.arguments, vec!["1", "2"]);
        assert_eq!(inv.end, 9);
    }

    #[test]
    fn test_nested_call_keeps_inner_commas() {
        let inv = scan("ADD(ADD(1,2), 3)").unwrap();
        assert_eq!(inv.arguments, vec!["ADD(1,2)", "3"]);
        assert_eq!(inv.end, 16);
    }

    #[test]
    fn test_all_bracket_kinds_nest() {
        let inv = scan("F([1, 2], {a: 1, b: 2}, (x, y))").unwrap();
        assert_eq!(inv.arguments, vec!["[1, 2]", "{a: 1, b: 2}", "(x, y)"]);
    }

    #[test]
    fn test_empty_argument_list() {
        assert!(scan("F()").unwrap().arguments.is_empty());
        assert!(scan("F(   )").unwrap().arguments.is_empty());
    }

    #[test]
    fn test_empty_arguments_between_commas_are_kept() {
        let inv = scan("F(, )").unwrap();
        assert_eq!(inv.arguments, vec!["", ""]);
    }

    #[test]
    fn test_unterminated() {
        assert!(scan("F(a, g(b)").is_none());
    }

    #[test]
    fn test_multibyte_text() {
        let inv = scan("F('é', \"ü\") // ✓").unwrap();
        assert_eq!(inv.arguments, vec!["'é'", "\"ü\""]);
    }
}
