//! Variable reference splitter
//!
//! Locates the first well-formed `${scalar}`, `@{list}`, `%{env}` (or other
//! recognized sigil) reference in a string. The search first finds a
//! candidate start (an unescaped sigil directly followed by `{`) and then
//! walks forward with a small state machine that tracks nested braces and an
//! optional `[index]` suffix on list references.
//!
//! Offsets are byte offsets into the original string. Sigils and brackets
//! are ASCII, so every offset produced here lies on a char boundary.

use crate::error::DataError;
use crate::variables::Variables;

/// Sigils recognized by default
pub const DEFAULT_IDENTIFIERS: &[char] = &['$', '@', '%', '&', '*'];

/// One variable reference found in a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    /// Sigil character
    pub identifier: char,
    /// Text between the outer braces
    pub base: String,
    /// Text between `[` and `]` of a list item access
    pub index: Option<String>,
    /// Offset of the sigil
    pub start: usize,
    /// Exclusive end offset, just past the closing `}` or `]` (`${a}` ends at 4)
    pub end: usize,
    /// Base contains a nested reference and must be substituted before lookup
    pub may_have_internal: bool,
}

impl VariableRef {
    /// The base with nested references resolved.
    pub fn replaced_base(&self, variables: &Variables) -> Result<String, DataError> {
        if self.may_have_internal {
            variables.replace_string(&self.base)
        } else {
            Ok(self.base.clone())
        }
    }

    /// Whether the reference covers all of `text`
    pub fn spans(&self, text: &str) -> bool {
        self.start == 0 && self.end == text.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitState {
    Variable,
    InternalVariableStart,
    WaitingIndex,
    Index,
}

/// Find the first variable reference in `string`.
///
/// Returns `None` when the string holds no complete reference; that is the
/// normal "nothing to substitute" answer, not an error.
pub fn split_variable(string: &str, identifiers: &[char]) -> Option<VariableRef> {
    let bytes = string.as_bytes();
    let max_index = string.rfind('}')?;
    let start = find_start_index(bytes, 1, max_index, identifiers)?;
    let identifier = bytes[start] as char;

    let mut state = SplitState::Variable;
    let mut depth = 1usize;
    let mut may_have_internal = false;
    let mut variable_end: Option<usize> = None;
    let mut index_open: Option<usize> = None;
    let mut index_close: Option<usize> = None;

    for (pos, &byte) in bytes.iter().enumerate().skip(start + 2) {
        match state {
            SplitState::Variable => {
                if byte == b'}' {
                    depth -= 1;
                    if depth == 0 {
                        variable_end = Some(pos + 1);
                        if identifier == '@' {
                            state = SplitState::WaitingIndex;
                        } else {
                            break;
                        }
                    }
                } else if is_identifier(byte, identifiers) {
                    state = SplitState::InternalVariableStart;
                }
            }
            SplitState::InternalVariableStart => {
                if byte == b'{' {
                    depth += 1;
                    may_have_internal = true;
                }
                state = SplitState::Variable;
            }
            SplitState::WaitingIndex => {
                if byte == b'[' {
                    index_open = Some(pos);
                    state = SplitState::Index;
                } else {
                    break;
                }
            }
            SplitState::Index => {
                if byte == b']' {
                    index_close = Some(pos);
                    break;
                }
            }
        }
        let scanning_base = matches!(state, SplitState::Variable | SplitState::InternalVariableStart);
        if scanning_base && pos > max_index {
            break;
        }
    }

    let variable_end = variable_end?;
    let base = string[start + 2..variable_end - 1].to_string();
    let (index, end) = match (index_open, index_close) {
        (Some(open), Some(close)) => (Some(string[open + 1..close].to_string()), close + 1),
        _ => (None, variable_end),
    };

    Some(VariableRef {
        identifier,
        base,
        index,
        start,
        end,
        may_have_internal,
    })
}

/// Find the first sigil followed by `{` in `bytes[from..end]` that is not
/// escaped by an odd number of backslashes.
fn find_start_index(bytes: &[u8], mut from: usize, end: usize, identifiers: &[char]) -> Option<usize> {
    loop {
        if from >= end {
            return None;
        }
        let brace = bytes[from..end].iter().position(|&b| b == b'{')? + from;
        let index = brace - 1;
        if start_index_is_ok(bytes, index, identifiers) {
            return Some(index);
        }
        from = index + 2;
    }
}

fn start_index_is_ok(bytes: &[u8], index: usize, identifiers: &[char]) -> bool {
    if !is_identifier(bytes[index], identifiers) {
        return false;
    }
    let backslashes = bytes[..index].iter().rev().take_while(|&&b| b == b'\\').count();
    backslashes % 2 == 0
}

fn is_identifier(byte: u8, identifiers: &[char]) -> bool {
    byte.is_ascii() && identifiers.contains(&(byte as char))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str) -> Option<VariableRef> {
        split_variable(s, DEFAULT_IDENTIFIERS)
    }

    #[test]
    fn test_simple_scalar() {
        let var = split("${a}").unwrap();
        assert_eq!(var.identifier, '$');
        assert_eq!(var.base, "a");
        assert_eq!(var.index, None);
        assert_eq!((var.start, var.end), (0, 4));
        assert!(!var.may_have_internal);
    }

    #[test]
    fn test_list_with_index() {
        let s = "@{list}[2]";
        let var = split(s).unwrap();
        assert_eq!(var.identifier, '@');
        assert_eq!(var.base, "list");
        assert_eq!(var.index.as_deref(), Some("2"));
        assert_eq!(var.end, s.len());
    }

    #[test]
    fn test_list_without_index() {
        let var = split("@{list} tail").unwrap();
        assert_eq!(var.index, None);
        assert_eq!(var.end, 7);
    }

    #[test]
    fn test_unterminated_index_is_ignored() {
        let var = split("@{list}[2").unwrap();
        assert_eq!(var.index, None);
        assert_eq!(var.end, 7);
    }

    #[test]
    fn test_index_only_for_lists() {
        let var = split("${scalar}[0]").unwrap();
        assert_eq!(var.index, None);
        assert_eq!(var.end, 9);
    }

    #[test]
    fn test_no_variables() {
        assert!(split("no vars here").is_none());
        assert!(split("").is_none());
        assert!(split("{}").is_none());
        assert!(split("${unterminated").is_none());
    }

    #[test]
    fn test_escaped_sigil() {
        assert!(split("\\${x}").is_none());
        let var = split("\\\\${x}").unwrap();
        assert_eq!(var.start, 2);
        let var = split("\\${x} ${y}").unwrap();
        assert_eq!(var.base, "y");
    }

    #[test]
    fn test_variable_in_middle() {
        let var = split("Hello ${name}!").unwrap();
        assert_eq!(var.base, "name");
        assert_eq!((var.start, var.end), (6, 13));
    }

    #[test]
    fn test_first_of_many() {
        let var = split("${a}-${b}").unwrap();
        assert_eq!(var.base, "a");
        assert_eq!(var.end, 4);
    }

    #[test]
    fn test_nested_variable() {
        let var = split("${var_${i}}").unwrap();
        assert_eq!(var.base, "var_${i}");
        assert!(var.may_have_internal);
        assert_eq!(var.end, 11);
    }

    #[test]
    fn test_nested_index_variable() {
        let var = split("@{items}[${i}]").unwrap();
        assert_eq!(var.index.as_deref(), Some("${i}"));
    }

    #[test]
    fn test_other_sigils() {
        assert_eq!(split("%{HOME}").unwrap().identifier, '%');
        assert_eq!(split("&{dict}").unwrap().identifier, '&');
        assert!(split_variable("&{dict}", &['$', '@']).is_none());
    }

    #[test]
    fn test_sigil_without_brace_is_text() {
        let var = split("$ ${x}").unwrap();
        assert_eq!(var.start, 2);
    }

    #[test]
    fn test_unicode_offsets() {
        let s = "ä ${ö}";
        let var = split(s).unwrap();
        assert_eq!(var.base, "ö");
        assert_eq!(&s[var.start..var.end], "${ö}");
    }
}
