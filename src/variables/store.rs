//! Variable store
//!
//! Holds `${scalar}` and `@{list}` variables of one execution scope and
//! performs substitution of variable references in test data.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{trace, warn};

use crate::error::DataError;
use crate::utils::{normalize, unescape};
use crate::value::Value;
use crate::variables::extended;
use crate::variables::splitter::{split_variable, VariableRef, DEFAULT_IDENTIFIERS};

/// Source of `%{NAME}` environment variables
pub trait EnvProvider: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Environment of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvProvider for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Whether `name` is a syntactically valid variable name such as `${x}`.
pub fn is_var(name: &str) -> bool {
    is_var_with(name, DEFAULT_IDENTIFIERS)
}

/// Whether `name` is a valid `${scalar}` name
pub fn is_scalar_var(name: &str) -> bool {
    is_var(name) && name.starts_with('$')
}

/// Whether `name` is a valid `@{list}` name
pub fn is_list_var(name: &str) -> bool {
    is_var(name) && name.starts_with('@')
}

fn is_var_with(name: &str, identifiers: &[char]) -> bool {
    let mut chars = name.chars();
    let sigil_ok = chars.next().map_or(false, |c| identifiers.contains(&c));
    sigil_ok
        && name.len() > 3
        && name.rfind('{') == Some(1)
        && name.find('}') == Some(name.len() - 1)
}

fn extended_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$\{([ \w]+)(.+)\}$").unwrap_or_else(|e| panic!("invalid extended variable regex: {}", e))
    })
}

/// A scope of variables.
///
/// Names are matched ignoring case, spaces and underscores. The sigil is
/// part of the name, so `${x}` and `@{x}` are different variables.
#[derive(Clone)]
pub struct Variables {
    /// Variables in insertion order, with the name as first set
    entries: Vec<(String, Value)>,
    /// Normalized name → position in `entries`
    index: HashMap<String, usize>,
    identifiers: Vec<char>,
    env: Arc<dyn EnvProvider>,
}

impl std::fmt::Debug for Variables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variables")
            .field("entries", &self.entries)
            .field("identifiers", &self.identifiers)
            .finish()
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}

impl Variables {
    /// Empty scope reading `%{NAME}` from the process environment
    pub fn new() -> Self {
        Self::with_env(Arc::new(ProcessEnv))
    }

    pub fn with_env(env: Arc<dyn EnvProvider>) -> Self {
        Self::with_identifiers(DEFAULT_IDENTIFIERS, env)
    }

    pub fn with_identifiers(identifiers: &[char], env: Arc<dyn EnvProvider>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            identifiers: identifiers.to_vec(),
            env,
        }
    }

    pub fn identifiers(&self) -> &[char] {
        &self.identifiers
    }

    fn check_name(&self, name: &str) -> Result<(), DataError> {
        if is_var_with(name, &self.identifiers) {
            Ok(())
        } else {
            Err(DataError::new(format!("Invalid variable name '{}'", name)))
        }
    }

    /// Set a variable, replacing any existing one with the same normalized name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), DataError> {
        self.check_name(name)?;
        let value = value.into();
        let key = normalize(name);
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].1 = value;
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push((name.to_string(), value));
        }
        Ok(())
    }

    /// Look up a variable.
    ///
    /// Falls back to number, boolean and `None` literals for `${...}` names
    /// and then to the extended syntax (`${obj.attr}`, `${list[0]}`).
    pub fn get(&self, name: &str) -> Result<Value, DataError> {
        self.check_name(name)?;
        if let Some(value) = self.lookup(name) {
            return Ok(value.clone());
        }
        if let Some(value) = literal_value(name) {
            return Ok(value);
        }
        if let Some(result) = self.get_extended(name) {
            return result;
        }
        Err(DataError::new(format!("Non-existing variable '{}'", name)))
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.index.get(&normalize(name)).map(|&idx| &self.entries[idx].1)
    }

    /// `None` when `name` is not extended syntax or its base does not exist.
    fn get_extended(&self, name: &str) -> Option<Result<Value, DataError>> {
        let caps = extended_var_re().captures(name)?;
        let base_name = caps.get(1)?.as_str();
        let expression = caps.get(2)?.as_str();
        let base = self.get(&format!("${{{}}}", base_name)).ok()?;
        Some(extended::evaluate(&base, expression).map_err(|e| {
            DataError::new(format!("Resolving variable '{}' failed: {}", name, e))
        }))
    }

    /// Whether `name` resolves to a value
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Names of stored variables in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of this scope for a child scope; later changes to either
    /// side are not seen by the other.
    pub fn copy(&self) -> Variables {
        self.clone()
    }

    /// Copy all variables of `other` into this scope, overwriting.
    pub fn update(&mut self, other: &Variables) {
        for (name, value) in &other.entries {
            let key = normalize(name);
            if let Some(&idx) = self.index.get(&key) {
                self.entries[idx].1 = value.clone();
            } else {
                self.index.insert(key, self.entries.len());
                self.entries.push((name.clone(), value.clone()));
            }
        }
    }

    /// Replace variables in a list of items.
    ///
    /// An item that is exactly a `@{list}` reference is expanded in place;
    /// every other item goes through [`Variables::replace_scalar`].
    pub fn replace_list(&self, items: &[Value]) -> Result<Vec<Value>, DataError> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) if is_list_var(s) => match self.get(s)? {
                    Value::List(values) => results.extend(values),
                    other => {
                        return Err(DataError::new(format!(
                            "Value of variable '{}' is not list but {}",
                            s,
                            other.type_name()
                        )))
                    }
                },
                other => results.push(self.replace_scalar(other)?),
            }
        }
        Ok(results)
    }

    /// [`Variables::replace_list`] for raw string tokens
    pub fn replace_strings(&self, items: &[String]) -> Result<Vec<Value>, DataError> {
        let values: Vec<Value> = items.iter().map(|s| Value::String(s.clone())).collect();
        self.replace_list(&values)
    }

    /// Replace variables in a single item.
    ///
    /// Non-string items are returned unchanged. A string that is exactly one
    /// variable reference resolves to the variable's own value, whatever its
    /// type; anything else is substituted as a string.
    pub fn replace_scalar(&self, item: &Value) -> Result<Value, DataError> {
        let text = match item {
            Value::String(s) => s,
            other => return Ok(other.clone()),
        };
        match split_variable(text, &self.identifiers) {
            Some(var) if !var.base.is_empty() && var.spans(text) => self.resolve(&var),
            splitted => self.replace_from(text, splitted).map(Value::String),
        }
    }

    /// Replace variables in `text`; the result is always a string.
    pub fn replace_string(&self, text: &str) -> Result<String, DataError> {
        let splitted = split_variable(text, &self.identifiers);
        self.replace_from(text, splitted)
    }

    fn replace_from(&self, text: &str, mut splitted: Option<VariableRef>) -> Result<String, DataError> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        loop {
            let var = match splitted {
                Some(var) => var,
                None => {
                    result.push_str(&unescape(rest));
                    break;
                }
            };
            result.push_str(&unescape(&rest[..var.start]));
            match self.resolve(&var)? {
                Value::String(s) => result.push_str(&s),
                other => result.push_str(&other.to_string()),
            }
            rest = &rest[var.end..];
            splitted = split_variable(rest, &self.identifiers);
        }
        trace!(input = text, output = %result, "replaced variables");
        Ok(result)
    }

    /// Resolve one splitted reference according to its sigil.
    fn resolve(&self, var: &VariableRef) -> Result<Value, DataError> {
        match var.identifier {
            '$' | '@' if var.index.is_none() => {
                let name = format!("{}{{{}}}", var.identifier, var.replaced_base(self)?);
                self.get(&name)
            }
            '$' | '@' => self.resolve_list_item(var),
            '%' => self.resolve_environment(var),
            other => {
                let literal = format!("{}{{{}}}", other, var.base);
                warn!(
                    "Syntax '{}' is reserved for future use. Please escape it like '\\{}'.",
                    literal, literal
                );
                Ok(Value::String(literal))
            }
        }
    }

    fn resolve_environment(&self, var: &VariableRef) -> Result<Value, DataError> {
        let name = var.replaced_base(self)?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(Value::String(format!("%{{{}}}", var.base)));
        }
        self.env
            .get(name)
            .map(Value::String)
            .ok_or_else(|| DataError::new(format!("Environment variable '{}' does not exist", name)))
    }

    fn resolve_list_item(&self, var: &VariableRef) -> Result<Value, DataError> {
        let index_text = var.index.as_deref().unwrap_or_default();
        let not_found = || DataError::new(format!("Non-existing variable '@{{{}}}[{}]'", var.base, index_text));
        let index: i64 = self
            .replace_string(index_text)
            .map_err(|_| not_found())?
            .trim()
            .parse()
            .map_err(|_| not_found())?;
        let name = format!("@{{{}}}", var.replaced_base(self).map_err(|_| not_found())?);
        match self.get(&name) {
            Ok(Value::List(items)) => extended::resolve_index(index, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    /// Populate from variable table rows `(name, values)`.
    ///
    /// Existing variables are kept. Rows that fail are returned as errors
    /// while the remaining rows are still processed.
    pub fn set_from_variable_table(&mut self, rows: &[(String, Vec<String>)]) -> Vec<DataError> {
        let mut errors = Vec::new();
        for (raw_name, raw_values) in rows {
            match self.variable_table_value(raw_name, raw_values) {
                Ok((name, value)) => {
                    if self.lookup(&name).is_none() {
                        // name was validated while building the value
                        let _ = self.set(&name, value);
                    }
                }
                Err(e) => errors.push(DataError::new(format!(
                    "Setting variable '{}' failed: {}",
                    raw_name, e.message
                ))),
            }
        }
        errors
    }

    fn variable_table_value(&self, raw_name: &str, raw_values: &[String]) -> Result<(String, Value), DataError> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(DataError::new("No variable name given"));
        }
        let name = match name.strip_suffix('=') {
            Some(stripped) if is_var_with(stripped.trim_end(), &self.identifiers) => stripped.trim_end(),
            _ => name,
        };
        if !is_scalar_var(name) && !is_list_var(name) {
            return Err(DataError::new(format!("Invalid variable name '{}'", raw_name)));
        }
        let values: Vec<Value> = raw_values.iter().map(|v| Value::String(strip_escaped_spaces(v))).collect();
        let value = if name.starts_with('$') {
            match values.as_slice() {
                [] => Value::String(String::new()),
                [single] => self.replace_scalar(single)?,
                many => Value::List(self.replace_list(many)?),
            }
        } else {
            Value::List(self.replace_list(&values)?)
        };
        Ok((name.to_string(), value))
    }

    /// Import `(name, value)` pairs such as those produced by a variable file.
    ///
    /// Names prefixed with `LIST__` become `@{name}` and must hold lists;
    /// others become `${name}`.
    pub fn set_from_pairs(&mut self, pairs: Vec<(String, Value)>, overwrite: bool) -> Result<(), DataError> {
        for (raw_name, value) in pairs {
            let name = match raw_name.strip_prefix("LIST__") {
                Some(list_name) => {
                    if !matches!(value, Value::List(_)) {
                        return Err(DataError::new(format!(
                            "List variable '@{{{}}}' cannot get a non-list value '{}'",
                            list_name, value
                        )));
                    }
                    format!("@{{{}}}", list_name)
                }
                None => format!("${{{}}}", raw_name),
            };
            if overwrite || self.lookup(&name).is_none() {
                self.set(&name, value)?;
            }
        }
        Ok(())
    }
}

/// Literal `${42}`, `${1.5}`, `${True}` and `${None}` values
fn literal_value(name: &str) -> Option<Value> {
    if !name.starts_with('$') {
        return None;
    }
    let normalized = normalize(name);
    let base = normalized.get(2..normalized.len().checked_sub(1)?)?;
    match base {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "none" | "null" => Some(Value::None),
        _ => base
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| base.parse::<f64>().map(Value::Float))
            .ok(),
    }
}

/// Variable table values may protect leading/trailing spaces with `\`.
fn strip_escaped_spaces(item: &str) -> String {
    let mut item = item;
    if item.ends_with(" \\") {
        item = &item[..item.len() - 1];
    }
    if item.starts_with("\\ ") {
        item = &item[1..];
    }
    item.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vars() -> Variables {
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), "/home/robot".to_string());
        let mut v = Variables::with_env(Arc::new(env));
        v.set("${str}", "hello").unwrap();
        v.set("${int}", 42i64).unwrap();
        v.set("@{list}", vec!["a", "b", "c"]).unwrap();
        v.set("${none}", Value::None).unwrap();
        v
    }

    #[test]
    fn test_set_and_get() {
        let v = vars();
        assert_eq!(v.get("${str}").unwrap(), Value::from("hello"));
        assert_eq!(v.get("${S_T R}").unwrap(), Value::from("hello"));
        assert_eq!(v.get("@{list}").unwrap(), Value::from(vec!["a", "b", "c"]));
    }

    #[test]
    fn test_sigil_is_part_of_name() {
        let mut v = Variables::new();
        v.set("${x}", "scalar").unwrap();
        v.set("@{x}", vec!["list"]).unwrap();
        assert_eq!(v.get("${x}").unwrap(), Value::from("scalar"));
        assert_eq!(v.get("@{x}").unwrap(), Value::from(vec!["list"]));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_invalid_names() {
        let mut v = Variables::new();
        for name in ["x", "${}", "${x", "$x}", "${a}b", "#{x}"] {
            assert!(v.set(name, "v").is_err(), "{} should be invalid", name);
            let err = v.get(name).unwrap_err();
            assert!(err.message.starts_with("Invalid variable name"), "{}", err);
        }
    }

    #[test]
    fn test_missing_variable() {
        let err = vars().get("${missing}").unwrap_err();
        assert_eq!(err.message, "Non-existing variable '${missing}'");
    }

    #[test]
    fn test_literals() {
        let v = Variables::new();
        assert_eq!(v.get("${42}").unwrap(), Value::Int(42));
        assert_eq!(v.get("${-1}").unwrap(), Value::Int(-1));
        assert_eq!(v.get("${1.5}").unwrap(), Value::Float(1.5));
        assert_eq!(v.get("${True}").unwrap(), Value::Bool(true));
        assert_eq!(v.get("${FALSE}").unwrap(), Value::Bool(false));
        assert_eq!(v.get("${None}").unwrap(), Value::None);
        assert_eq!(v.get("${null}").unwrap(), Value::None);
        assert!(v.get("@{42}").is_err());
    }

    #[test]
    fn test_extended_syntax() {
        let mut v = vars();
        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::from("robot"));
        v.set("${user}", Value::Dict(user)).unwrap();
        v.set("${items}", vec!["x", "y"]).unwrap();
        assert_eq!(v.get("${user.name}").unwrap(), Value::from("robot"));
        assert_eq!(v.get("${items[1]}").unwrap(), Value::from("y"));
        assert_eq!(v.replace_string("Hi ${user.name}!").unwrap(), "Hi robot!");
        let err = v.get("${user.age}").unwrap_err();
        assert!(err.message.starts_with("Resolving variable '${user.age}' failed"), "{}", err);
    }

    #[test]
    fn test_replace_scalar_keeps_type() {
        let v = vars();
        assert_eq!(v.replace_scalar(&Value::from("${int}")).unwrap(), Value::Int(42));
        assert_eq!(v.replace_scalar(&Value::from("@{list}")).unwrap(), Value::from(vec!["a", "b", "c"]));
        assert_eq!(v.replace_scalar(&Value::from("${none}")).unwrap(), Value::None);
        assert_eq!(v.replace_scalar(&Value::Int(7)).unwrap(), Value::Int(7));
        assert_eq!(v.replace_scalar(&Value::from("x${int}")).unwrap(), Value::from("x42"));
    }

    #[test]
    fn test_replace_string() {
        let v = vars();
        assert_eq!(v.replace_string("${str} world").unwrap(), "hello world");
        assert_eq!(v.replace_string("${int}-${int}").unwrap(), "42-42");
        assert_eq!(v.replace_string("@{list}").unwrap(), "['a', 'b', 'c']");
        assert_eq!(v.replace_string("${none}").unwrap(), "None");
        assert_eq!(v.replace_string("\\${str} is ${str}").unwrap(), "${str} is hello");
    }

    #[test]
    fn test_replace_string_without_variables_unescapes() {
        let v = Variables::new();
        for s in ["", "plain text", "back\\\\slash", "tab\\there", "{braces}"] {
            assert_eq!(v.replace_string(s).unwrap(), unescape(s));
        }
    }

    #[test]
    fn test_replace_list_expands_lists() {
        let v = vars();
        let items: Vec<Value> = ["@{list}", "${str}", "@{list}[0]", "plain"].iter().map(|s| Value::from(*s)).collect();
        let result = v.replace_list(&items).unwrap();
        assert_eq!(result, Value::from(vec!["a", "b", "c", "hello", "a", "plain"]).as_list().unwrap().to_vec());
    }

    #[test]
    fn test_replace_list_with_trailing_text_is_scalar() {
        let v = vars();
        let result = v.replace_list(&[Value::from("@{list}!")]).unwrap();
        assert_eq!(result, vec![Value::from("['a', 'b', 'c']!")]);
    }

    #[test]
    fn test_list_item_access() {
        let mut v = vars();
        v.set("${i}", "2").unwrap();
        assert_eq!(v.replace_scalar(&Value::from("@{list}[1]")).unwrap(), Value::from("b"));
        assert_eq!(v.replace_scalar(&Value::from("@{list}[${i}]")).unwrap(), Value::from("c"));
        assert_eq!(v.replace_scalar(&Value::from("@{list}[-1]")).unwrap(), Value::from("c"));
        let err = v.replace_scalar(&Value::from("@{list}[9]")).unwrap_err();
        assert_eq!(err.message, "Non-existing variable '@{list}[9]'");
        let err = v.replace_scalar(&Value::from("@{list}[x]")).unwrap_err();
        assert_eq!(err.message, "Non-existing variable '@{list}[x]'");
    }

    #[test]
    fn test_nested_variables() {
        let mut v = vars();
        v.set("${name}", "str").unwrap();
        v.set("${var_1}", "one").unwrap();
        v.set("${n}", 1i64).unwrap();
        assert_eq!(v.replace_scalar(&Value::from("${${name}}")).unwrap(), Value::from("hello"));
        assert_eq!(v.replace_string("x ${var_${n}} y").unwrap(), "x one y");
    }

    #[test]
    fn test_environment_variables() {
        let v = vars();
        assert_eq!(v.replace_string("%{HOME}/bin").unwrap(), "/home/robot/bin");
        let err = v.replace_string("%{NOPE}").unwrap_err();
        assert_eq!(err.message, "Environment variable 'NOPE' does not exist");
    }

    #[test]
    fn test_reserved_sigils_are_kept() {
        let v = vars();
        assert_eq!(v.replace_string("&{dict} and *{x}").unwrap(), "&{dict} and *{x}");
    }

    #[test]
    fn test_set_from_variable_table() {
        let mut v = Variables::new();
        v.set("${existing}", "keep").unwrap();
        let rows = vec![
            ("${greeting}".to_string(), vec!["hello".to_string()]),
            ("${target} =".to_string(), vec!["${greeting} world".to_string()]),
            ("${empty}".to_string(), vec![]),
            ("${many}".to_string(), vec!["a".to_string(), "b".to_string()]),
            ("@{items}".to_string(), vec!["x".to_string(), "\\ padded".to_string()]),
            ("${existing}".to_string(), vec!["replace".to_string()]),
            ("bad".to_string(), vec!["v".to_string()]),
            ("${broken}".to_string(), vec!["${nope}".to_string()]),
        ];
        let errors = v.set_from_variable_table(&rows);
        assert_eq!(v.get("${greeting}").unwrap(), Value::from("hello"));
        assert_eq!(v.get("${target}").unwrap(), Value::from("hello world"));
        assert_eq!(v.get("${empty}").unwrap(), Value::from(""));
        assert_eq!(v.get("${many}").unwrap(), Value::from(vec!["a", "b"]));
        assert_eq!(v.get("@{items}").unwrap(), Value::from(vec!["x", " padded"]));
        assert_eq!(v.get("${existing}").unwrap(), Value::from("keep"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Setting variable 'bad' failed: Invalid variable name 'bad'");
        assert!(errors[1].message.contains("Non-existing variable '${nope}'"));
    }

    #[test]
    fn test_set_from_pairs() {
        let mut v = Variables::new();
        v.set_from_pairs(
            vec![
                ("NAME".to_string(), Value::from("x")),
                ("LIST__ITEMS".to_string(), Value::from(vec!["a"])),
            ],
            false,
        )
        .unwrap();
        assert_eq!(v.get("${name}").unwrap(), Value::from("x"));
        assert_eq!(v.get("@{items}").unwrap(), Value::from(vec!["a"]));
        let err = v
            .set_from_pairs(vec![("LIST__BAD".to_string(), Value::from("x"))], false)
            .unwrap_err();
        assert!(err.message.contains("cannot get a non-list value"));
    }

    #[test]
    fn test_copy_is_independent() {
        let parent = vars();
        let mut child = parent.clone();
        child.set("${str}", "changed").unwrap();
        assert_eq!(parent.get("${str}").unwrap(), Value::from("hello"));
        let mut merged = Variables::new();
        merged.update(&child);
        assert_eq!(merged.get("${str}").unwrap(), Value::from("changed"));
    }
}
