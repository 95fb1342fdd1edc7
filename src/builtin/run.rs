//! Keywords running other keywords

use anyhow::bail;

use super::check_args;
use crate::error::{ExecutionFailed, FailureKind};
use crate::keywords::Context;
use crate::namespace::{Handler, KeywordUsage};
use crate::utils::Matcher;
use crate::value::Value;

/// Split `name *args` and run the named keyword.
fn run_named(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, ExecutionFailed> {
    match args.split_first() {
        Some((name, rest)) => ctx.run_keyword(&name.to_string(), rest.to_vec()),
        None => Err(ExecutionFailed::new("Keyword name cannot be empty.")),
    }
}

/// Timeouts, fatal errors and syntax errors are never caught.
fn is_uncatchable(err: &ExecutionFailed) -> bool {
    err.timeout || err.exit || err.syntax
}

// ──────────────────────────────────────────────────────────
// Run Keyword — run a keyword given by name
// ──────────────────────────────────────────────────────────

pub(super) struct RunKeyword;

impl Handler for RunKeyword {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Run Keyword", args, 1, None)?;
        Ok(run_named(ctx, args)?)
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Executes the given keyword with the given arguments".into(),
            args: "name *args".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Run Keyword And Continue On Failure
// ──────────────────────────────────────────────────────────

pub(super) struct RunKeywordAndContinueOnFailure;

impl Handler for RunKeywordAndContinueOnFailure {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Run Keyword And Continue On Failure", args, 1, None)?;
        run_named(ctx, args).map_err(|err| err.with_kind(FailureKind::Continuable).into())
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Runs the keyword and continues execution even if a failure occurs".into(),
            args: "name *args".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Run Keyword And Ignore Error — return status and result
// ──────────────────────────────────────────────────────────

pub(super) struct RunKeywordAndIgnoreError;

impl Handler for RunKeywordAndIgnoreError {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Run Keyword And Ignore Error", args, 1, None)?;
        match run_named(ctx, args) {
            Ok(value) => Ok(Value::List(vec!["PASS".into(), value])),
            Err(err) if is_uncatchable(&err) => Err(err.into()),
            Err(err) => Ok(Value::List(vec!["FAIL".into(), Value::String(err.message)])),
        }
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Runs the given keyword with the given arguments and ignores possible error".into(),
            args: "name *args".into(),
            deprecated: None,
        }
    }
}

// ──────────────────────────────────────────────────────────
// Run Keyword And Expect Error — fail unless the keyword fails
// ──────────────────────────────────────────────────────────

pub(super) struct RunKeywordAndExpectError;

impl Handler for RunKeywordAndExpectError {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        check_args("Run Keyword And Expect Error", args, 2, None)?;
        let expected = args[0].to_string();
        match run_named(ctx, &args[1..]) {
            Ok(_) => bail!("Expected error '{}' did not occur", expected),
            Err(err) if is_uncatchable(&err) => Err(err.into()),
            Err(err) if Matcher::new(&expected).matches(&err.message) => Ok(Value::String(err.message)),
            Err(err) => bail!("Expected error '{}' but got '{}'", expected, err.message),
        }
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: "Runs the keyword and checks that the expected error occurred".into(),
            args: "expected_error name *args".into(),
            deprecated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;
    use crate::output::LogOutput;
    use crate::variables::Variables;

    fn run(name: &str, args: Vec<Value>) -> (Result<Value, ExecutionFailed>, String) {
        let ns = Namespace::new();
        let mut vars = Variables::new();
        let mut out = LogOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let result = ctx.run_keyword(name, args);
        (result, out.log)
    }

    #[test]
    fn test_run_keyword_returns_value() {
        let (result, log) = run("Run Keyword", vec!["Catenate".into(), "a".into(), "b".into()]);
        assert_eq!(result.unwrap(), Value::from("a b"));
        assert!(log.contains("> BuiltIn.Run Keyword    Catenate    a    b"));
        assert!(log.contains("  > BuiltIn.Catenate    a    b"));
    }

    #[test]
    fn test_run_keyword_propagates_failure() {
        let (result, _) = run("Run Keyword", vec!["Fail".into(), "inner".into()]);
        let err = result.unwrap_err();
        assert_eq!(err.message, "inner");
        assert!(!err.can_continue());
    }

    #[test]
    fn test_continue_on_failure() {
        let (result, _) = run("Run Keyword And Continue On Failure", vec!["Fail".into(), "x".into()]);
        assert!(result.unwrap_err().can_continue());
        let (result, _) = run("Run Keyword And Continue On Failure", vec!["Fatal Error".into()]);
        assert!(!result.unwrap_err().can_continue());
    }

    #[test]
    fn test_ignore_error() {
        let (result, _) = run("Run Keyword And Ignore Error", vec!["Fail".into(), "nope".into()]);
        assert_eq!(result.unwrap(), Value::List(vec!["FAIL".into(), "nope".into()]));
        let (result, _) = run("Run Keyword And Ignore Error", vec!["Set Variable".into(), Value::Int(1)]);
        assert_eq!(result.unwrap(), Value::List(vec!["PASS".into(), Value::Int(1)]));
        let (result, _) = run("Run Keyword And Ignore Error", vec!["Fatal Error".into(), "stop".into()]);
        assert!(result.unwrap_err().exit);
    }

    #[test]
    fn test_expect_error() {
        let (result, _) = run(
            "Run Keyword And Expect Error",
            vec!["Boom*".into(), "Fail".into(), "Boom: went wrong".into()],
        );
        assert_eq!(result.unwrap(), Value::from("Boom: went wrong"));

        let (result, _) = run(
            "Run Keyword And Expect Error",
            vec!["Other".into(), "Fail".into(), "Boom".into()],
        );
        assert_eq!(result.unwrap_err().message, "Expected error 'Other' but got 'Boom'");

        let (result, _) = run("Run Keyword And Expect Error", vec!["*".into(), "No Operation".into()]);
        assert_eq!(result.unwrap_err().message, "Expected error '*' did not occur");
    }
}
