//! Execution errors
//!
//! Two kinds of failure travel through the engine:
//!
//! - [`DataError`]: the test data itself is broken (bad variable name,
//!   wrong FOR loop arguments, unmet assignment targets). Always fatal to the
//!   step that hit it.
//! - [`ExecutionFailed`]: a keyword failed at run time. Carries a
//!   [`FailureKind`] deciding whether sibling steps keep running, plus the
//!   `timeout` / `exit` / `syntax` flags that enclosing frames react to.

use thiserror::Error;

/// Invalid test data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DataError {
    pub message: String,
}

impl DataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Whether a failure stops the sequence it happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Abort the containing sequence immediately
    Fatal,
    /// Record the failure and keep running sibling steps
    Continuable,
}

/// A keyword failed during execution
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ExecutionFailed {
    pub message: String,
    pub kind: FailureKind,
    /// Failure was caused by an exceeded timeout
    pub timeout: bool,
    /// Failure should stop the whole run
    pub exit: bool,
    /// Failure comes from a step that could not be parsed
    pub syntax: bool,
    /// Individual failures when this is an aggregate of several
    pub errors: Vec<ExecutionFailed>,
}

impl ExecutionFailed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Fatal,
            timeout: false,
            exit: false,
            syntax: false,
            errors: Vec::new(),
        }
    }

    pub fn continuable(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(FailureKind::Continuable)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self { timeout: true, ..Self::new(message) }
    }

    pub fn exit(message: impl Into<String>) -> Self {
        Self { exit: true, ..Self::new(message) }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self { syntax: true, ..Self::new(message) }
    }

    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Aggregate several failures raised inside one keyword body.
    ///
    /// The aggregate is continuable only if every part is, and inherits the
    /// `timeout` and `exit` flags from any part.
    pub fn multiple(errors: Vec<ExecutionFailed>) -> Self {
        if errors.len() == 1 {
            if let Some(single) = errors.into_iter().next() {
                return single;
            }
            return Self::new("");
        }
        let message = multiple_errors_message(&errors);
        let all_continuable = errors.iter().all(ExecutionFailed::can_continue);
        Self {
            message,
            kind: if all_continuable { FailureKind::Continuable } else { FailureKind::Fatal },
            timeout: errors.iter().any(|e| e.timeout),
            exit: errors.iter().any(|e| e.exit),
            syntax: errors.iter().any(|e| e.syntax),
            errors,
        }
    }

    /// Whether the surrounding sequence may keep running after this failure
    pub fn can_continue(&self) -> bool {
        self.kind == FailureKind::Continuable && !self.timeout && !self.exit && !self.syntax
    }

    /// The individual failures, flattening aggregates.
    pub fn get_errors(&self) -> Vec<ExecutionFailed> {
        if self.errors.is_empty() {
            vec![self.clone()]
        } else {
            self.errors.iter().flat_map(ExecutionFailed::get_errors).collect()
        }
    }
}

impl From<DataError> for ExecutionFailed {
    fn from(e: DataError) -> Self {
        Self::new(e.message)
    }
}

/// Join failure messages the way test and keyword reports show them.
pub fn multiple_errors_message(errors: &[ExecutionFailed]) -> String {
    match errors {
        [] => String::new(),
        [single] => single.message.clone(),
        many => {
            let mut message = String::from("Several failures occurred:");
            for (i, err) in many.iter().enumerate() {
                message.push_str(&format!("\n\n{}) {}", i + 1, err.message));
            }
            message
        }
    }
}
