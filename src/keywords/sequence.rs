//! Running a body of steps
//!
//! A fatal failure stops the body at once; a continuable one is recorded
//! and the next step still runs. How the collected failures are reported
//! depends on whether the body belongs to a test case or a user keyword.

use super::{Context, Keyword};
use crate::error::ExecutionFailed;
use crate::timeouts::SuiteRunErrors;

fn run_body<F>(keywords: &mut [Keyword], ctx: &mut Context<'_>, mut on_failure: F) -> Vec<ExecutionFailed>
where
    F: FnMut(&ExecutionFailed, &Context<'_>),
{
    let mut errors = Vec::new();
    for kw in keywords.iter_mut() {
        if let Err(err) = kw.run(ctx) {
            on_failure(&err, ctx);
            let stop = !err.can_continue();
            errors.push(err);
            if stop {
                break;
            }
        }
    }
    errors
}

/// Run a test case body and return every failure, aggregates flattened.
///
/// Each failure is forwarded to the test timeout (keyword timeouts) and to
/// the run errors (exit requests).
pub fn run_test_case_keywords(
    keywords: &mut [Keyword],
    ctx: &mut Context<'_>,
    run_errors: &mut SuiteRunErrors,
) -> Vec<ExecutionFailed> {
    let errors = run_body(keywords, ctx, |err, ctx| {
        if let Some(timeout) = ctx.timeout {
            timeout.set_keyword_timeout(err.timeout);
        }
        run_errors.test_failed(err.exit, false);
    });
    errors.iter().flat_map(ExecutionFailed::get_errors).collect()
}

/// Run a user keyword body; failures are raised as one aggregate.
pub fn run_user_keyword_keywords(keywords: &mut [Keyword], ctx: &mut Context<'_>) -> Result<(), ExecutionFailed> {
    let errors = run_body(keywords, ctx, |_, _| {});
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ExecutionFailed::multiple(errors))
    }
}
