//! Extended variable syntax
//!
//! `${base.attr}`, `${base[0]}`, `${base[1:3]}` and `${base['key']}` apply
//! an access expression to an already resolved value. Only attribute
//! access, indexing and slicing are understood; nothing is evaluated as
//! code.

use crate::value::Value;

/// One step of an access expression
#[derive(Debug, Clone, PartialEq)]
enum Access {
    Attribute(String),
    Index(i64),
    Key(String),
    Slice(Option<i64>, Option<i64>, Option<i64>),
}

/// Apply `expression` (for example `.name[0]`) to `value`.
pub fn evaluate(value: &Value, expression: &str) -> Result<Value, String> {
    let accesses = parse(expression)?;
    let mut current = value.clone();
    for access in &accesses {
        current = apply(&current, access)?;
    }
    Ok(current)
}

fn parse(expression: &str) -> Result<Vec<Access>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut accesses = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                if end == start {
                    return Err(format!("invalid syntax at '{}'", rest(&chars, i)));
                }
                accesses.push(Access::Attribute(chars[start..end].iter().collect()));
                i = end;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| p + i + 1)
                    .ok_or_else(|| format!("unclosed '[' in '{}'", expression))?;
                let inner: String = chars[i + 1..close].iter().collect();
                accesses.push(parse_subscript(inner.trim())?);
                i = close + 1;
            }
            c if c.is_whitespace() => i += 1,
            _ => return Err(format!("invalid syntax at '{}'", rest(&chars, i))),
        }
    }
    if accesses.is_empty() {
        return Err("empty expression".to_string());
    }
    Ok(accesses)
}

fn rest(chars: &[char], from: usize) -> String {
    chars[from..].iter().collect()
}

fn parse_subscript(inner: &str) -> Result<Access, String> {
    if let Some(key) = quoted(inner) {
        return Ok(Access::Key(key));
    }
    if inner.contains(':') {
        let parts: Vec<&str> = inner.split(':').collect();
        if parts.len() > 3 {
            return Err(format!("invalid slice '{}'", inner));
        }
        let bound = |i: usize| -> Result<Option<i64>, String> {
            match parts.get(i).map(|p| p.trim()) {
                None | Some("") => Ok(None),
                Some(p) => p.parse().map(Some).map_err(|_| format!("invalid slice index '{}'", p)),
            }
        };
        return Ok(Access::Slice(bound(0)?, bound(1)?, bound(2)?));
    }
    inner
        .parse()
        .map(Access::Index)
        .map_err(|_| format!("invalid index '{}'", inner))
}

fn quoted(inner: &str) -> Option<String> {
    let first = inner.chars().next()?;
    if (first == '\'' || first == '"') && inner.len() >= 2 && inner.ends_with(first) {
        Some(inner[1..inner.len() - 1].to_string())
    } else {
        None
    }
}

fn apply(value: &Value, access: &Access) -> Result<Value, String> {
    match (value, access) {
        (Value::Dict(map), Access::Attribute(name) | Access::Key(name)) => map
            .get(name)
            .cloned()
            .ok_or_else(|| format!("dictionary has no key '{}'", name)),
        (Value::List(items), Access::Index(i)) => resolve_index(*i, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| "list index out of range".to_string()),
        (Value::String(s), Access::Index(i)) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(*i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(|| "string index out of range".to_string())
        }
        (Value::List(items), Access::Slice(start, stop, step)) => {
            let picked = slice_indices(items.len(), *start, *stop, *step)?;
            Ok(Value::List(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        (Value::String(s), Access::Slice(start, stop, step)) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), *start, *stop, *step)?;
            Ok(Value::String(picked.into_iter().map(|i| chars[i]).collect()))
        }
        (other, Access::Attribute(name)) => {
            Err(format!("'{}' object has no attribute '{}'", other.type_name(), name))
        }
        (other, _) => Err(format!("'{}' object is not subscriptable this way", other.type_name())),
    }
}

/// Resolve a possibly negative index against `len`.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        Some(resolved as usize)
    } else {
        None
    }
}

fn slice_indices(len: usize, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<Vec<usize>, String> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("slice step cannot be zero".to_string());
    }
    let len = len as i64;
    let clamp = |v: i64, low: i64, high: i64| v.max(low).min(high);
    let adjust = |v: i64| if v < 0 { v + len } else { v };
    let mut indices = Vec::new();
    if step > 0 {
        let start = start.map(|s| clamp(adjust(s), 0, len)).unwrap_or(0);
        let stop = stop.map(|s| clamp(adjust(s), 0, len)).unwrap_or(len);
        let mut i = start;
        while i < stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = start.map(|s| clamp(adjust(s), -1, len - 1)).unwrap_or(len - 1);
        let stop = stop.map(|s| clamp(adjust(s), -1, len - 1)).unwrap_or(-1);
        let mut i = start;
        while i > stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn list() -> Value {
        Value::from(vec!["a", "b", "c", "d"])
    }

    #[test]
    fn test_index() {
        assert_eq!(evaluate(&list(), "[0]").unwrap(), Value::from("a"));
        assert_eq!(evaluate(&list(), "[-1]").unwrap(), Value::from("d"));
        assert!(evaluate(&list(), "[4]").is_err());
    }

    #[test]
    fn test_slice() {
        assert_eq!(evaluate(&list(), "[1:3]").unwrap(), Value::from(vec!["b", "c"]));
        assert_eq!(evaluate(&list(), "[::2]").unwrap(), Value::from(vec!["a", "c"]));
        assert_eq!(evaluate(&list(), "[::-1]").unwrap(), Value::from(vec!["d", "c", "b", "a"]));
        assert_eq!(evaluate(&Value::from("hello"), "[1:-1]").unwrap(), Value::from("ell"));
    }

    #[test]
    fn test_slice_extreme_bounds() {
        assert_eq!(evaluate(&list(), "[1::9223372036854775807]").unwrap(), Value::from(vec!["b"]));
        assert_eq!(evaluate(&list(), "[-2::-9223372036854775808]").unwrap(), Value::from(vec!["c"]));
        assert_eq!(
            evaluate(&list(), "[-9223372036854775808:9223372036854775807]").unwrap(),
            list()
        );
        assert_eq!(evaluate(&list(), "[9223372036854775807:]").unwrap(), Value::List(vec![]));
        assert!(evaluate(&list(), "[::0]").is_err());
    }

    #[test]
    fn test_dict_access() {
        let mut inner = BTreeMap::new();
        inner.insert("name".to_string(), Value::from("robot"));
        let mut outer = BTreeMap::new();
        outer.insert("user".to_string(), Value::Dict(inner));
        let value = Value::Dict(outer);
        assert_eq!(evaluate(&value, ".user.name").unwrap(), Value::from("robot"));
        assert_eq!(evaluate(&value, "['user']['name']").unwrap(), Value::from("robot"));
        assert!(evaluate(&value, ".missing").is_err());
    }

    #[test]
    fn test_rejects_code() {
        assert!(evaluate(&list(), ".__class__()").is_err());
        assert!(evaluate(&list(), " + 1").is_err());
        assert!(evaluate(&Value::Int(1), ".real").is_err());
    }
}
