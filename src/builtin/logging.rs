//! Logging and failing: No Operation, Log, Fail, Fatal Error

use anyhow::bail;

use super::{check_args, text_arg};
use crate::error::ExecutionFailed;
use crate::keywords::Context;
use crate::namespace::{Handler, KeywordUsage};
use crate::output::LogLevel;
use crate::value::Value;

// ──────────────────────────────────────────────────────────
// No Operation — does nothing
// ──────────────────────────────────────────────────────────

pub(super) struct NoOperation;

impl Handler for NoOperation {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("No Operation", args, 0, Some(0))?;
        Ok(Value::None)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Does absolutely nothing".into(),
            args: "".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Log — log a message at a level
// ──────────────────────────────────────────────────────────

pub(super) struct Log;

impl Handler for Log {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Log", args, 1, Some(2))?;
        let level = match text_arg(args, 1) {
            Some(level) => level.parse::<LogLevel>().map_err(anyhow::Error::msg)?,
            None => LogLevel::Info,
        };
        if level == LogLevel::Fail {
            bail!("Invalid log level 'FAIL'");
        }
        ctx.output.message(level, &args[0].to_string());
        Ok(Value::None)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Logs the given message with the given level".into(),
            args: "message [level=INFO]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Fail — fail the test
// ──────────────────────────────────────────────────────────

pub(super) struct Fail;

impl Handler for Fail {
    fn run(&self, _ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Fail", args, 0, Some(1))?;
        let msg = text_arg(args, 0).filter(|m| !m.is_empty()).unwrap_or_else(|| "Failed.".into());
        bail!("{}", msg)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Fails the test with the given message".into(),
            args: "[msg]".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Fatal Error — stop the whole run
// ──────────────────────────────────────────────────────────

pub(super) struct FatalError;

impl Handler for FatalError {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Fatal Error", args, 0, Some(1))?;
        let msg = text_arg(args, 0)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Execution terminated by a fatal error.".into());
        ctx.output.fail(&msg);
        Err(ExecutionFailed::exit(msg).into())
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Stops the whole test execution".into(),
            args: "[msg]".into(),
            deprecated: None,
        }
    }
}
