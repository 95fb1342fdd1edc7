//! Verification keywords: lengths, equality, containment, conversion

use anyhow::bail;
use similar::TextDiff;

use super::{check_args, is_truthy, text_arg, to_int};
use crate::keywords::Context;
use crate::namespace::{Handler, KeywordUsage};
use crate::value::Value;

// ──────────────────────────────────────────────────────────
// Get Length — length of a string, list or dictionary
// ──────────────────────────────────────────────────────────

pub(super) struct GetLength;

impl Handler for GetLength {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Get Length", args, 1, Some(1))?;
        Ok(Value::Int(length_of(&args[0])?))
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Returns and logs the length of the given item".into(),
            args: "item".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Length Should Be — verify the length of an item
// ──────────────────────────────────────────────────────────

pub(super) struct LengthShouldBe;

impl Handler for LengthShouldBe {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Length Should Be", args, 2, Some(3))?;
        let actual = length_of(&args[0])?;
        let expected = match to_int(&args[1]) {
            Some(n) => n,
            None => bail!("'{}' cannot be converted to an integer", args[1]),
        };
        if actual != expected {
            match text_arg(args, 2) {
                Some(msg) => bail!("{}", msg),
                None => bail!("Length of '{}' should be {} but is {}", args[0], expected, actual),
            }
        }
        Ok(Value::None)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Verifies that the length of the given item is correct".into(),
            args: "item length [msg]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Should Be Equal — fail unless two values are equal
// ──────────────────────────────────────────────────────────

pub(super) struct ShouldBeEqual;

impl Handler for ShouldBeEqual {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Should Be Equal", args, 2, Some(4))?;
        let (first, second) = (&args[0], &args[1]);
        if first == second {
            return Ok(Value::None);
        }
        let default = match (first, second) {
            (Value::String(a), Value::String(b)) if a.contains('\n') || b.contains('\n') => {
                let diff = TextDiff::from_lines(a.as_str(), b.as_str());
                let udiff = diff.unified_diff().header("first", "second").to_string();
                format!("Multiline strings are different:\n{}", udiff.trim_end())
            }
            _ => format!("{} != {}", first, second),
        };
        bail!("{}", failure_message(default, args.get(2), args.get(3)))
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Fails if the given objects are unequal".into(),
            args: "first second [msg] [values=True]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Should Not Be Equal — fail if two values are equal
// ──────────────────────────────────────────────────────────

pub(super) struct ShouldNotBeEqual;

impl Handler for ShouldNotBeEqual {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Should Not Be Equal", args, 2, Some(4))?;
        if args[0] != args[1] {
            return Ok(Value::None);
        }
        let default = format!("{} == {}", args[0], args[1]);
        bail!("{}", failure_message(default, args.get(2), args.get(3)))
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Fails if the given objects are equal".into(),
            args: "first second [msg] [values=True]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Should Contain — fail unless a container holds an item
// ──────────────────────────────────────────────────────────

pub(super) struct ShouldContain;

impl Handler for ShouldContain {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Should Contain", args, 2, Some(4))?;
        let (container, item) = (&args[0], &args[1]);
        let found = match container {
            Value::String(s) => s.contains(&item.to_string()),
            Value::List(items) => items.contains(item),
            Value::Dict(map) => map.contains_key(&item.to_string()),
            other => bail!("'{}' of type {} cannot contain items", other, other.type_name()),
        };
        if !found {
            let default = format!("'{}' does not contain '{}'", container, item);
            bail!("{}", failure_message(default, args.get(2), args.get(3)));
        }
        Ok(Value::None)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Fails if container does not contain item one or more times".into(),
            args: "container item [msg] [values=True]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Convert To Integer
// ──────────────────────────────────────────────────────────

pub(super) struct ConvertToInteger;

impl Handler for ConvertToInteger {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Convert To Integer", args, 1, Some(1))?;
        match to_int(&args[0]) {
            Some(n) => Ok(Value::Int(n)),
            None => bail!("'{}' cannot be converted to an integer", args[0]),
        }
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Converts the given item to an integer number".into(),
            args: "item".into(),
            deprecated: None,
        }
    }
}

fn length_of(item: &Value) -> anyhow::Result<i64> {
    match item.len() {
        Some(len) => Ok(len as i64),
        None => bail!("Could not get length of '{}'", item),
    }
}

/// Custom message replaces the default, or prefixes it when `values` is true.
fn failure_message(default: String, msg: Option<&Value>, values: Option<&Value>) -> String {
    match msg {
        None => default,
        Some(msg) if msg.is_none() => default,
        Some(msg) if values.map_or(true, is_truthy) => format!("{}: {}", msg, default),
        Some(msg) => msg.to_string(),
    }
}
