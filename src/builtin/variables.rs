//! Variable keywords: Set Variable, Create List, Catenate,
//! Get Variable Value, Variable Should Exist

use anyhow::bail;

use super::{check_args, text_arg};
use crate::keywords::Context;
use crate::namespace::{Handler, KeywordUsage};
use crate::value::Value;
use crate::variables::is_var;

/// Prefix of the optional first `Catenate` argument
const SEPARATOR_PREFIX: &str = "SEPARATOR=";

// ──────────────────────────────────────────────────────────
// Set Variable — return the given values
// ──────────────────────────────────────────────────────────

pub(super) struct SetVariable;

impl Handler for SetVariable {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        Ok(match args {
            [] => Value::String(String::new()),
            [single] => single.clone(),
            many => Value::List(many.to_vec()),
        })
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Returns the given values which can then be assigned to variables".into(),
            args: "*values".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Create List — return the arguments as a list
// ──────────────────────────────────────────────────────────

pub(super) struct CreateList;

impl Handler for CreateList {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        Ok(Value::List(args.to_vec()))
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Returns a list containing given items".into(),
            args: "*items".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Catenate — join items into a string
// ──────────────────────────────────────────────────────────

pub(super) struct Catenate;

impl Handler for Catenate {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        let (separator, items) = match args.split_first() {
            Some((Value::String(first), rest)) if first.starts_with(SEPARATOR_PREFIX) => {
                (first[SEPARATOR_PREFIX.len()..].to_string(), rest)
            }
            _ => (" ".to_string(), args),
        };
        let parts: Vec<String> = items.iter().map(Value::to_string).collect();
        Ok(Value::String(parts.join(&separator)))
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Catenates the given items together and returns the resulted string".into(),
            args: "[SEPARATOR=sep] *items".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Get Variable Value — value of a variable or a default
// ──────────────────────────────────────────────────────────

pub(super) struct GetVariableValue;

impl Handler for GetVariableValue {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Get Variable Value", args, 1, Some(2))?;
        let name = variable_name(&args[0].to_string())?;
        match ctx.variables.get(&name) {
            Ok(value) => Ok(value),
            Err(_) => Ok(args.get(1).cloned().unwrap_or_default()),
        }
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Returns variable value or default if the variable does not exist".into(),
            args: "name [default=None]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Variable Should Exist — fail if a variable is missing
// ──────────────────────────────────────────────────────────

pub(super) struct VariableShouldExist;

impl Handler for VariableShouldExist {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Variable Should Exist", args, 1, Some(2))?;
        let name = variable_name(&args[0].to_string())?;
        if ctx.variables.get(&name).is_err() {
            match text_arg(args, 1) {
                Some(msg) => bail!("{}", msg),
                None => bail!("Variable {} does not exist", name),
            }
        }
        Ok(Value::None)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Fails unless the given variable exists".into(),
            args: "name [msg]".into(),
            deprecated: None,
        }
    }
}

/// Accept `${name}` (escaped in test data) as well as the `$name` form.
fn variable_name(raw: &str) -> anyhow::Result<String> {
    if is_var(raw) {
        return Ok(raw.to_string());
    }
    let mut chars = raw.chars();
    match chars.next() {
        Some(sigil @ ('$' | '@')) if !chars.as_str().is_empty() => Ok(format!("{}{{{}}}", sigil, chars.as_str())),
        _ => bail!("Invalid variable syntax '{}'", raw),
    }
}
