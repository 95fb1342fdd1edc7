//! Small text helpers shared across the engine

use std::time::Duration;

use regex::Regex;

use crate::value::Value;

/// Maximum length of a logged assignment value before it is cut
const MAX_ASSIGN_LENGTH: usize = 200;

/// Normalize a name for case, space and underscore insensitive lookup.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Remove backslash escapes from test data.
///
/// `\n`, `\t` and `\r` become control characters, `\xHH` and `\uHHHH`
/// become the encoded character, any other escaped character is kept
/// literally and a trailing lone backslash is dropped.
pub fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            None => {}
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(prefix @ ('x' | 'u')) => {
                let width = if prefix == 'x' { 2 } else { 4 };
                let mut digits = String::new();
                while digits.len() < width {
                    match chars.peek() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let decoded = if digits.len() == width {
                    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
                } else {
                    None
                };
                match decoded {
                    Some(ch) => result.push(ch),
                    None => {
                        result.push(prefix);
                        result.push_str(&digits);
                    }
                }
            }
            Some(other) => result.push(other),
        }
    }
    result
}

/// Cut a long value shown in an assignment log message.
pub fn cut_long_assign_msg(msg: &str) -> String {
    if msg.chars().count() <= MAX_ASSIGN_LENGTH {
        return msg.to_string();
    }
    let cut: String = msg.chars().take(MAX_ASSIGN_LENGTH).collect();
    format!("{}...", cut)
}

/// `'a', 'b' and 'c'`
pub fn seq2str(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [single] => single.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// `"s"` when `count` is not one
pub fn plural_or_not(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// `[ a | b | c ]`, used when logging list assignments
pub fn seq2str2(items: &[Value]) -> String {
    if items.is_empty() {
        return "[ ]".to_string();
    }
    let parts: Vec<String> = items.iter().map(Value::to_string).collect();
    format!("[ {} ]", parts.join(" | "))
}

/// Human readable duration, e.g. `1 minute 30 seconds` or `500 milliseconds`
pub fn secs_to_timestr(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    if total_millis == 0 {
        return "0 seconds".to_string();
    }
    let units = [
        (86_400_000u128, "day"),
        (3_600_000, "hour"),
        (60_000, "minute"),
        (1_000, "second"),
        (1, "millisecond"),
    ];
    let mut rest = total_millis;
    let mut parts = Vec::new();
    for (size, name) in units {
        let count = rest / size;
        rest %= size;
        if count > 0 {
            let suffix = if count == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", count, name, suffix));
        }
    }
    parts.join(" ")
}

/// Glob-style pattern (`*`, `?`), by default matched case, space and
/// underscore insensitively
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    normalized: bool,
    regex: Option<Regex>,
}

impl Matcher {
    pub fn new(pattern: &str) -> Self {
        Self::build(pattern, true)
    }

    /// Matcher comparing text as-is
    pub fn exact(pattern: &str) -> Self {
        Self::build(pattern, false)
    }

    fn build(pattern: &str, normalized: bool) -> Self {
        let source = if normalized { normalize(pattern) } else { pattern.to_string() };
        let mut re = String::from("(?s)^");
        for c in source.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        Self {
            pattern: pattern.to_string(),
            normalized,
            regex: Regex::new(&re).ok(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, text: &str) -> bool {
        let candidate = if self.normalized { normalize(text) } else { text.to_string() };
        match &self.regex {
            Some(regex) => regex.is_match(&candidate),
            None => candidate == self.pattern,
        }
    }

    pub fn matches_any<'a>(&self, texts: impl IntoIterator<Item = &'a String>) -> bool {
        texts.into_iter().any(|t| self.matches(t))
    }
}
