//! Test timeouts and run-level error state
//!
//! Nothing here interrupts a running keyword. The engine asks
//! [`TestTimeout::timed_out`] after every handler returns and turns an
//! exceeded limit into a timeout failure of that step.

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::utils::secs_to_timestr;

/// Wall-clock limit of one test
#[derive(Debug)]
pub struct TestTimeout {
    limit: Option<Duration>,
    started: Option<Instant>,
    keyword_timeout_occurred: Cell<bool>,
}

impl Default for TestTimeout {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TestTimeout {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            started: None,
            keyword_timeout_occurred: Cell::new(false),
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn active(&self) -> bool {
        self.limit.is_some() && self.started.is_some()
    }

    /// Whether the limit has been reached
    pub fn timed_out(&self) -> bool {
        match (self.limit, self.started) {
            (Some(limit), Some(started)) => started.elapsed() >= limit,
            _ => false,
        }
    }

    /// Time left before the limit, zero once exceeded
    pub fn remaining(&self) -> Option<Duration> {
        match (self.limit, self.started) {
            (Some(limit), Some(started)) => Some(limit.saturating_sub(started.elapsed())),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        let limit = self.limit.unwrap_or_default();
        format!("Test timeout {} exceeded.", secs_to_timestr(limit))
    }

    /// Record that a step of this test failed because of a timeout.
    pub fn set_keyword_timeout(&self, occurred: bool) {
        if occurred {
            self.keyword_timeout_occurred.set(true);
        }
    }

    pub fn keyword_timeout_occurred(&self) -> bool {
        self.keyword_timeout_occurred.get()
    }
}

/// Reason a test is not run at all
const EXIT_MESSAGE: &str = "Test execution stopped due to a fatal error.";
const EXIT_ON_FAILURE_MESSAGE: &str = "Critical failure occurred and exit-on-failure mode is in use.";

/// Run-wide failure state deciding whether later tests still run
#[derive(Debug, Default, Clone)]
pub struct SuiteRunErrors {
    exit_on_failure: bool,
    exit: bool,
    critical_failure: bool,
}

impl SuiteRunErrors {
    pub fn new(exit_on_failure: bool) -> Self {
        Self {
            exit_on_failure,
            ..Self::default()
        }
    }

    /// A test (or one of its steps) failed.
    pub fn test_failed(&mut self, exit: bool, critical: bool) {
        if exit {
            self.exit = true;
        }
        if critical && self.exit_on_failure {
            self.critical_failure = true;
        }
    }

    /// Message for tests that must not run any more, if any
    pub fn stop_message(&self) -> Option<&'static str> {
        if self.exit {
            Some(EXIT_MESSAGE)
        } else if self.critical_failure {
            Some(EXIT_ON_FAILURE_MESSAGE)
        } else {
            None
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_message().is_some()
    }
}
