//! emx-keyword: A keyword-driven test execution engine
//!
//! Inspired by table-driven acceptance test runners.
//!
//! # Overview
//!
//! Tests are lists of keyword steps. A step names a keyword from an
//! imported [`Library`], passes arguments containing `${scalar}`,
//! `@{list}` and `%{ENV}` references, and may assign the return value to
//! variables. Steps run in order; a failure stops the test unless it is
//! continuable, and fixtures (setup/teardown) run around tests and suites.
//!
//! # Step Syntax
//!
//! ```text
//! Log                  Hello, ${name}!
//! ${len} =             Get Length    ${items}
//! ${first}    @{rest} =    Set Variable    @{items}
//! :FOR    ${item}    IN    @{items}
//!     Should Contain    ${item}    x
//! :FOR    ${i}    IN RANGE    1    10    2
//!     Log    ${i}
//! ```
//!
//! # Step Kinds
//!
//! | Kind | Description |
//! |------|-------------|
//! | plain | Run a keyword with arguments |
//! | set | Run a keyword and assign its return value |
//! | for | Run a body once per value group (or range value) |
//! | error | Placeholder for a step that could not be parsed |
//!
//! # Failures
//!
//! - Fatal failures stop the current body
//! - Continuable failures are collected and the body goes on
//! - Exit failures (`Fatal Error`) stop the whole run
//! - Test timeouts are checked after every keyword returns

mod builtin;
mod cache;
mod criticality;
mod error;
mod keywords;
mod location;
mod model;
mod namespace;
mod output;
mod runner;
mod stats;
mod timeouts;
mod utils;
mod value;
mod variables;

pub use builtin::{library as builtin_library, LIBRARY_NAME as BUILTIN};
pub use cache::{decode_text, TextCache};
pub use criticality::Criticality;
pub use error::{multiple_errors_message, DataError, ExecutionFailed, FailureKind};
pub use keywords::{
    run_test_case_keywords, run_user_keyword_keywords, Assignment, Context, ForIteration, ForLoop, Keyword,
    KeywordKind, KeywordResult, PlainKeyword, SetKeyword, Status, SyntaxErrorKeyword, UserKeyword,
};
pub use location::Location;
pub use model::{TestCase, TestSuite};
pub use namespace::{BoxedHandler, FnHandler, Handler, KeywordUsage, Library, Namespace, ResolvedHandler};
pub use output::{timestamp, DebugFile, KeywordEvent, LogLevel, LogOutput, NullOutput, Output};
pub use runner::{Message, RunConfig, RunResult, RunnerBuilder, SuiteResult, SuiteRunner, TestCaseResult};
pub use stats::{Counts, NodeId, Statistics};
pub use timeouts::{SuiteRunErrors, TestTimeout};
pub use utils::{normalize, unescape, Matcher};
pub use value::Value;
pub use variables::{
    is_list_var, is_scalar_var, is_var, split_variable, EnvProvider, ProcessEnv, VariableRef, Variables,
    DEFAULT_IDENTIFIERS,
};

// Convenience functions for cargo test integration
pub use runner::{run_and_assert, run_and_assert_with, runner};
