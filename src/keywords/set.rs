//! Keyword call whose return value is assigned to variables

use super::plain::PlainKeyword;
use super::{Context, KeywordKind};
use crate::error::{DataError, ExecutionFailed, FailureKind};
use crate::utils::{cut_long_assign_msg, plural_or_not, seq2str, seq2str2};
use crate::value::Value;
use crate::variables::is_list_var;

/// Assignment targets: scalars first, then at most one list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub scalar_vars: Vec<String>,
    pub list_var: Option<String>,
}

impl Assignment {
    pub fn new(scalar_vars: Vec<String>, list_var: Option<String>) -> Self {
        Self { scalar_vars, list_var }
    }

    /// Split written targets; a trailing `=` on a target is ignored.
    pub fn from_targets(targets: Vec<String>) -> Self {
        let mut assignment = Self::default();
        for target in targets {
            let name = target.trim_end_matches('=').trim_end().to_string();
            if is_list_var(&name) {
                assignment.list_var = Some(name);
            } else {
                assignment.scalar_vars.push(name);
            }
        }
        assignment
    }

    pub fn is_empty(&self) -> bool {
        self.scalar_vars.is_empty() && self.list_var.is_none()
    }

    /// All targets in assignment order
    pub fn targets(&self) -> Vec<String> {
        let mut targets = self.scalar_vars.clone();
        targets.extend(self.list_var.iter().cloned());
        targets
    }

    /// Assign the outcome of keyword `name` and return the outcome to report.
    ///
    /// A continuable failure still sets every target to its empty value
    /// before it is passed on.
    pub(super) fn apply(
        &self,
        outcome: Result<Value, ExecutionFailed>,
        name: &str,
        ctx: &mut Context<'_>,
    ) -> Result<Value, ExecutionFailed> {
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                if err.kind == FailureKind::Continuable {
                    if let Err(data_err) = self.set_variables(Value::None, name, ctx) {
                        ctx.output.fail(&data_err.message);
                    }
                }
                return Err(err);
            }
        };
        match self.set_variables(value.clone(), name, ctx) {
            Ok(()) => Ok(value),
            Err(err) => {
                ctx.output.fail(&err.message);
                Err(ExecutionFailed::new(err.message))
            }
        }
    }

    fn set_variables(&self, ret: Value, name: &str, ctx: &mut Context<'_>) -> Result<(), DataError> {
        for (var, value) in self.vars_to_set(ret, name)? {
            let shown = match &value {
                Value::List(items) => seq2str2(items),
                other => other.to_string(),
            };
            ctx.variables.set(&var, value)?;
            ctx.output.info(&format!("{} = {}", var, cut_long_assign_msg(&shown)));
        }
        Ok(())
    }

    /// Pair every target with its part of `ret`.
    pub fn vars_to_set(&self, ret: Value, name: &str) -> Result<Vec<(String, Value)>, DataError> {
        if ret.is_none() {
            let mut pairs: Vec<(String, Value)> = self.scalar_vars.iter().map(|v| (v.clone(), Value::None)).collect();
            if let Some(list_var) = &self.list_var {
                pairs.push((list_var.clone(), Value::List(Vec::new())));
            }
            return Ok(pairs);
        }
        match &self.list_var {
            None => self.only_scalars(ret, name),
            Some(list_var) => match ret.iter_items() {
                Some(items) => self.scalars_and_list(items, list_var, name),
                None => Err(self.invalid_return_value(&ret, name, true)),
            },
        }
    }

    fn only_scalars(&self, ret: Value, name: &str) -> Result<Vec<(String, Value)>, DataError> {
        let needed = self.scalar_vars.len();
        if needed == 0 {
            return Ok(Vec::new());
        }
        if needed == 1 {
            return Ok(vec![(self.scalar_vars[0].clone(), ret)]);
        }
        let items = match ret {
            Value::List(items) => items,
            other => return Err(self.invalid_return_value(&other, name, true)),
        };
        if items.len() < needed {
            return Err(self.invalid_return_value(&Value::List(items), name, false));
        }
        let mut items = items;
        let surplus = items.split_off(needed - 1);
        let mut pairs: Vec<(String, Value)> = self.scalar_vars.iter().cloned().zip(items).collect();
        let last = self.scalar_vars[needed - 1].clone();
        if surplus.len() == 1 {
            pairs.push((last, surplus.into_iter().next().unwrap_or_default()));
        } else {
            pairs.push((last, Value::List(surplus)));
        }
        Ok(pairs)
    }

    fn scalars_and_list(&self, items: Vec<Value>, list_var: &str, name: &str) -> Result<Vec<(String, Value)>, DataError> {
        let needed = self.scalar_vars.len();
        if items.len() < needed {
            return Err(self.invalid_return_value(&Value::List(items), name, false));
        }
        let mut items = items;
        let rest = items.split_off(needed);
        let mut pairs: Vec<(String, Value)> = self.scalar_vars.iter().cloned().zip(items).collect();
        pairs.push((list_var.to_string(), Value::List(rest)));
        Ok(pairs)
    }

    fn invalid_return_value(&self, ret: &Value, name: &str, wrong_type: bool) -> DataError {
        let reason = if wrong_type {
            format!("Expected list, got {} instead", ret.type_name())
        } else {
            format!("Need more values than {}", ret.len().unwrap_or_default())
        };
        let targets = self.targets();
        DataError::new(format!(
            "Cannot assign return value of keyword '{}' to variable{} {}: {}",
            name,
            plural_or_not(targets.len()),
            seq2str(&targets),
            reason
        ))
    }
}

/// `${a}    ${b} =    Keyword    args`
#[derive(Debug, Clone)]
pub struct SetKeyword {
    pub assignment: Assignment,
    pub keyword: PlainKeyword,
}

impl SetKeyword {
    pub fn new(assignment: Assignment, name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            assignment,
            keyword: PlainKeyword::new(name, args),
        }
    }

    pub fn run(&mut self, ctx: &mut Context<'_>) -> Result<Value, ExecutionFailed> {
        self.keyword.run_as(ctx, KeywordKind::Set, Some(&self.assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::keywords::Status;
    use crate::variables::Variables;

    fn targets(names: &[&str]) -> Assignment {
        Assignment::from_targets(names.iter().map(|s| s.to_string()).collect())
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_from_targets() {
        let a = targets(&["${a}", "${b}", "@{rest} ="]);
        assert_eq!(a.scalar_vars, vec!["${a}", "${b}"]);
        assert_eq!(a.list_var.as_deref(), Some("@{rest}"));
        assert_eq!(a.targets(), vec!["${a}", "${b}", "@{rest}"]);
    }

    #[test]
    fn test_surplus_collapses_into_last_scalar() {
        let pairs = targets(&["${a}", "${b}"]).vars_to_set(list(&["a", "b", "c"]), "kw").unwrap();
        assert_eq!(pairs, vec![("${a}".to_string(), Value::from("a")), ("${b}".to_string(), list(&["b", "c"]))]);
    }

    #[test]
    fn test_exact_match_zips() {
        let pairs = targets(&["${a}", "${b}"]).vars_to_set(list(&["x", "y"]), "kw").unwrap();
        assert_eq!(pairs[1], ("${b}".to_string(), Value::from("y")));
    }

    #[test]
    fn test_scalar_and_empty_list_rest() {
        let pairs = targets(&["${a}", "@{rest}"]).vars_to_set(list(&["a"]), "kw").unwrap();
        assert_eq!(
            pairs,
            vec![("${a}".to_string(), Value::from("a")), ("@{rest}".to_string(), Value::List(vec![]))]
        );
    }

    #[test]
    fn test_none_sets_everything_empty() {
        let pairs = targets(&["${a}", "${b}", "@{c}"]).vars_to_set(Value::None, "kw").unwrap();
        assert_eq!(pairs[0].1, Value::None);
        assert_eq!(pairs[1].1, Value::None);
        assert_eq!(pairs[2].1, Value::List(vec![]));
    }

    #[test]
    fn test_single_scalar_takes_whole_value() {
        let pairs = targets(&["${s}"]).vars_to_set(Value::from("text"), "kw").unwrap();
        assert_eq!(pairs, vec![("${s}".to_string(), Value::from("text"))]);
        let pairs = targets(&["${s}"]).vars_to_set(list(&["a", "b"]), "kw").unwrap();
        assert_eq!(pairs[0].1, list(&["a", "b"]));
    }

    #[test]
    fn test_only_list_takes_all_items() {
        let pairs = targets(&["@{all}"]).vars_to_set(list(&["a", "b"]), "kw").unwrap();
        assert_eq!(pairs, vec![("@{all}".to_string(), list(&["a", "b"]))]);
    }

    #[test]
    fn test_no_targets_assigns_nothing() {
        let none = targets(&[]);
        assert!(none.is_empty());
        assert!(none.vars_to_set(list(&["a", "b"]), "kw").unwrap().is_empty());
        assert!(none.vars_to_set(Value::from("text"), "kw").unwrap().is_empty());
        assert!(none.vars_to_set(Value::None, "kw").unwrap().is_empty());
    }

    #[test]
    fn test_errors() {
        let err = targets(&["${a}", "${b}"]).vars_to_set(Value::from("text"), "BuiltIn.Kw").unwrap_err();
        assert_eq!(
            err.message,
            "Cannot assign return value of keyword 'BuiltIn.Kw' to variables '${a}' and '${b}': Expected list, got string instead"
        );
        let err = targets(&["${a}", "${b}", "${c}"]).vars_to_set(list(&["x"]), "kw").unwrap_err();
        assert!(err.message.ends_with("Need more values than 1"));
        let err = targets(&["@{l}"]).vars_to_set(Value::Int(3), "kw").unwrap_err();
        assert_eq!(
            err.message,
            "Cannot assign return value of keyword 'kw' to variable '@{l}': Expected list, got integer instead"
        );
    }

    #[test]
    fn test_set_keyword_assigns_and_logs() {
        let (ns, _) = namespace();
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = SetKeyword::new(
            targets(&["${first}", "@{rest}"]),
            "Return List",
            vec!["a".into(), "b".into(), "c".into()],
        );
        kw.run(&mut ctx).unwrap();
        assert_eq!(kw.keyword.name, "${first}, @{rest} = Test.Return List");
        assert_eq!(kw.keyword.result.status, Status::Pass);
        assert!(out.events.contains(&"INFO ${first} = a".to_string()));
        assert!(out.events.contains(&"INFO @{rest} = [ b | c ]".to_string()));
        assert_eq!(vars.get("${first}").unwrap(), Value::from("a"));
        assert_eq!(vars.get("@{rest}").unwrap(), list(&["b", "c"]));
    }

    #[test]
    fn test_set_keyword_without_targets_passes() {
        let (ns, _) = namespace();
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = SetKeyword::new(Assignment::default(), "Return List", vec!["a".into(), "b".into()]);
        let value = kw.run(&mut ctx).unwrap();
        assert_eq!(value, list(&["a", "b"]));
        assert_eq!(kw.keyword.name, "Test.Return List");
        assert_eq!(kw.keyword.result.status, Status::Pass);
    }

    #[test]
    fn test_destructuring_failure_fails_step() {
        let (ns, _) = namespace();
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = SetKeyword::new(targets(&["${a}", "${b}", "${c}"]), "Return List", vec!["x".into()]);
        let err = kw.run(&mut ctx).unwrap_err();
        assert!(!err.can_continue());
        assert_eq!(
            err.message,
            "Cannot assign return value of keyword 'Test.Return List' to variables '${a}', '${b}' and '${c}': Need more values than 1"
        );
        assert_eq!(kw.keyword.result.status, Status::Fail);
        assert!(!vars.contains("${a}"));
    }

    #[test]
    fn test_continuable_failure_still_sets_targets() {
        let (ns, _) = namespace();
        let mut vars = Variables::new();
        vars.set("${a}", "stale").unwrap();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = SetKeyword::new(targets(&["${a}", "@{b}"]), "Soft Fail", vec!["nope".into()]);
        let err = kw.run(&mut ctx).unwrap_err();
        assert!(err.can_continue());
        assert_eq!(vars.get("${a}").unwrap(), Value::None);
        assert_eq!(vars.get("@{b}").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_fatal_failure_leaves_targets() {
        let (ns, _) = namespace();
        let mut vars = Variables::new();
        vars.set("${a}", "old").unwrap();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = SetKeyword::new(targets(&["${a}"]), "Boom", vec!["x".into()]);
        kw.run(&mut ctx).unwrap_err();
        assert_eq!(vars.get("${a}").unwrap(), Value::from("old"));
    }
}
