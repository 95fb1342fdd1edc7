//! Keyword execution
//!
//! A test body is a list of [`Keyword`] steps. Each step kind runs through
//! the same bracket: timestamp start, notify [`Output::start_keyword`], do
//! the work, timestamp end, notify [`Output::end_keyword`], then report the
//! outcome. Failures travel upward as [`ExecutionFailed`].

mod for_loop;
mod plain;
mod sequence;
mod set;
mod user;

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::ExecutionFailed;
use crate::namespace::Namespace;
use crate::output::{KeywordEvent, Output};
use crate::timeouts::TestTimeout;
use crate::value::Value;
use crate::variables::Variables;

pub use for_loop::{ForIteration, ForLoop};
pub use plain::PlainKeyword;
pub use sequence::{run_test_case_keywords, run_user_keyword_keywords};
pub use set::{Assignment, SetKeyword};
pub use user::UserKeyword;

/// Execution status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    NotRun,
    Running,
    Pass,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::NotRun => "NOT_RUN",
            Status::Running => "RUNNING",
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        };
        write!(f, "{}", s)
    }
}

/// What kind of step an output event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Keyword,
    Set,
    For,
    ForItem,
    Error,
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeywordKind::Keyword => "KEYWORD",
            KeywordKind::Set => "SET",
            KeywordKind::For => "FOR",
            KeywordKind::ForItem => "FOR ITEM",
            KeywordKind::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Status and timing of one executed step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordResult {
    pub status: Status,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    pub elapsed: Option<Duration>,
}

impl KeywordResult {
    /// Enter RUNNING.
    pub fn start(&mut self) {
        self.status = Status::Running;
        self.start_time = Some(SystemTime::now());
    }

    /// Leave RUNNING with a final status.
    pub fn finish(&mut self, passed: bool) {
        let end = SystemTime::now();
        self.status = if passed { Status::Pass } else { Status::Fail };
        self.elapsed = self.start_time.and_then(|start| end.duration_since(start).ok());
        self.end_time = Some(end);
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }
}

/// Everything a running step may touch
pub struct Context<'a> {
    pub namespace: &'a Namespace,
    /// Scope of the running test or user keyword
    pub variables: &'a mut Variables,
    pub output: &'a mut dyn Output,
    pub timeout: Option<&'a TestTimeout>,
}

impl<'a> Context<'a> {
    pub fn new(namespace: &'a Namespace, variables: &'a mut Variables, output: &'a mut dyn Output) -> Self {
        Self {
            namespace,
            variables,
            output,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: &'a TestTimeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run keyword `name` with already resolved arguments.
    ///
    /// Used by library keywords that call other keywords; the arguments
    /// are not variable-substituted again.
    pub fn run_keyword(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ExecutionFailed> {
        PlainKeyword::with_values(name, args).run(self)
    }

    /// Same namespace, output and timeout over a different scope
    pub fn with_scope<'b>(&'b mut self, variables: &'b mut Variables) -> Context<'b> {
        Context {
            namespace: self.namespace,
            variables,
            output: &mut *self.output,
            timeout: self.timeout,
        }
    }

    /// Timeout failure to inject into the running step, if the test timeout
    /// has been exceeded
    pub(crate) fn timeout_failure(&self) -> Option<ExecutionFailed> {
        let timeout = self.timeout?;
        if timeout.timed_out() {
            Some(ExecutionFailed::timeout(timeout.message()))
        } else {
            None
        }
    }
}

/// One step of a test or keyword body
#[derive(Debug, Clone)]
pub enum Keyword {
    Plain(PlainKeyword),
    Set(SetKeyword),
    For(ForLoop),
    SyntaxError(SyntaxErrorKeyword),
}

impl Keyword {
    pub fn plain(name: impl Into<String>, args: Vec<String>) -> Self {
        Keyword::Plain(PlainKeyword::new(name, args))
    }

    /// `${a}    @{rest} =    Keyword    args`
    pub fn set(targets: Vec<String>, name: impl Into<String>, args: Vec<String>) -> Self {
        Keyword::Set(SetKeyword::new(Assignment::from_targets(targets), name, args))
    }

    pub fn for_loop(vars: Vec<String>, items: Vec<String>, is_range: bool, body: Vec<Keyword>) -> Self {
        Keyword::For(ForLoop::new(vars, items, is_range, body))
    }

    pub fn syntax_error(name: impl Into<String>, error: impl Into<String>) -> Self {
        Keyword::SyntaxError(SyntaxErrorKeyword::new(name, error))
    }

    /// Execute the step.
    pub fn run(&mut self, ctx: &mut Context<'_>) -> Result<Value, ExecutionFailed> {
        match self {
            Keyword::Plain(kw) => kw.run(ctx),
            Keyword::Set(kw) => kw.run(ctx),
            Keyword::For(kw) => kw.run(ctx).map(|_| Value::None),
            Keyword::SyntaxError(kw) => kw.run(ctx).map(|_| Value::None),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Keyword::Plain(kw) => &kw.name,
            Keyword::Set(kw) => &kw.keyword.name,
            Keyword::For(kw) => &kw.name,
            Keyword::SyntaxError(kw) => &kw.name,
        }
    }

    pub fn kind(&self) -> KeywordKind {
        match self {
            Keyword::Plain(_) => KeywordKind::Keyword,
            Keyword::Set(_) => KeywordKind::Set,
            Keyword::For(_) => KeywordKind::For,
            Keyword::SyntaxError(_) => KeywordKind::Error,
        }
    }

    pub fn result(&self) -> &KeywordResult {
        match self {
            Keyword::Plain(kw) => &kw.result,
            Keyword::Set(kw) => &kw.keyword.result,
            Keyword::For(kw) => &kw.result,
            Keyword::SyntaxError(kw) => &kw.result,
        }
    }

    pub fn status(&self) -> Status {
        self.result().status
    }
}

/// Placeholder for a step that could not be parsed
#[derive(Debug, Clone)]
pub struct SyntaxErrorKeyword {
    pub name: String,
    pub error: String,
    pub result: KeywordResult,
}

impl SyntaxErrorKeyword {
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            result: KeywordResult::default(),
        }
    }

    /// Always fails with the stored message; no handler is looked up.
    pub fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), ExecutionFailed> {
        self.result.start();
        ctx.output.start_keyword(&KeywordEvent {
            kind: KeywordKind::Error,
            name: &self.name,
            args: &[],
            result: &self.result,
        });
        ctx.output.fail(&self.error);
        self.result.finish(false);
        ctx.output.end_keyword(&KeywordEvent {
            kind: KeywordKind::Error,
            name: &self.name,
            args: &[],
            result: &self.result,
        });
        Err(ExecutionFailed::syntax(self.error.clone()))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_result_state_machine() {
        let mut result = KeywordResult::default();
        assert_eq!(result.status, Status::NotRun);
        result.start();
        assert_eq!(result.status, Status::Running);
        result.finish(true);
        assert!(result.passed());
        assert!(result.elapsed.is_some());
        assert!(result.end_time >= result.start_time);
    }

    #[test]
    fn test_syntax_error_never_runs_handler() {
        let (ns, calls) = namespace();
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let mut kw = Keyword::syntax_error("Record", "Invalid syntax in FOR loop.");
        let err = kw.run(&mut ctx).unwrap_err();
        assert!(err.syntax);
        assert!(!err.can_continue());
        assert_eq!(err.message, "Invalid syntax in FOR loop.");
        assert_eq!(kw.status(), Status::Fail);
        assert!(journal(&calls).is_empty());
        assert_eq!(
            out.events,
            vec!["start Record", "FAIL Invalid syntax in FOR loop.", "end Record FAIL"]
        );
    }

    #[test]
    fn test_run_keyword_passes_values_unchanged() {
        let (ns, calls) = namespace();
        let mut vars = Variables::new();
        vars.set("${x}", "value").unwrap();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        ctx.run_keyword("Record", vec![Value::from("${x}")]).unwrap();
        assert_eq!(journal(&calls), vec!["${x}"]);
    }
}
