//! Suite runner
//!
//! Walks a [`TestSuite`] tree depth-first: builds each suite's variable
//! scope, runs suite and test fixtures, runs test bodies through the
//! keyword engine, and collects statuses, statistics, log messages and the
//! text cache into a [`RunResult`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::cache::TextCache;
use crate::criticality::Criticality;
use crate::error::{multiple_errors_message, ExecutionFailed};
use crate::keywords::{run_test_case_keywords, Context, Keyword, Status};
use crate::location::Location;
use crate::model::{TestCase, TestSuite};
use crate::namespace::{Library, Namespace};
use crate::output::{DebugFile, KeywordEvent, LogLevel, LogOutput, Output};
use crate::stats::{Counts, Statistics};
use crate::timeouts::{SuiteRunErrors, TestTimeout};
use crate::value::Value;
use crate::variables::{EnvProvider, ProcessEnv, Variables, DEFAULT_IDENTIFIERS};

/// Configuration for the suite runner
pub struct RunConfig {
    /// Tag patterns making tests critical (empty: every test is critical)
    pub critical: Vec<String>,
    /// Tag patterns making tests non-critical
    pub non_critical: Vec<String>,
    /// Messages below this level are not recorded
    pub log_level: LogLevel,
    /// Stop running tests after the first critical failure
    pub exit_on_failure: bool,
    /// Write a plain-text debug file while running
    pub debug_file: Option<PathBuf>,
    /// Characters starting a variable, [`DEFAULT_IDENTIFIERS`] by default
    pub identifiers: Vec<char>,
    /// Texts at least this long may be stored compressed
    pub text_cache_threshold: usize,
    /// Global variables, `LIST__name` for lists
    pub variables: Vec<(String, Value)>,
    /// Source of `%{NAME}` values
    pub env: Arc<dyn EnvProvider>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            critical: Vec::new(),
            non_critical: Vec::new(),
            log_level: LogLevel::Info,
            exit_on_failure: false,
            debug_file: None,
            identifiers: DEFAULT_IDENTIFIERS.to_vec(),
            text_cache_threshold: 20,
            variables: Vec::new(),
            env: Arc::new(ProcessEnv),
        }
    }
}

/// A log message recorded during the run
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Location id of the innermost open suite, test or keyword
    pub id: String,
    pub level: LogLevel,
    pub text: String,
    /// Index of `text` in [`RunResult::strings`]
    pub text_id: usize,
    pub timestamp: SystemTime,
}

/// Result of running a suite tree
#[derive(Debug)]
pub struct RunResult {
    /// Result of the top-level suite
    pub suite: SuiteResult,
    /// Recorded messages in execution order
    pub messages: Vec<Message>,
    /// Text cache dump, indexed by [`Message::text_id`]
    pub strings: Vec<String>,
    /// Warnings, whatever the log level
    pub errors: Vec<Message>,
    /// Execution log
    pub log: String,
    /// Total duration
    pub duration: Duration,
}

impl RunResult {
    /// Check if no critical test failed
    pub fn all_passed(&self) -> bool {
        self.suite.stats.critical_failed() == 0
    }

    /// Count passed tests
    pub fn passed_count(&self) -> usize {
        self.suite.stats.total_passed
    }

    /// Count failed tests
    pub fn failed_count(&self) -> usize {
        self.suite.stats.total_failed()
    }

    /// Count failed critical tests
    pub fn critical_failed_count(&self) -> usize {
        self.suite.stats.critical_failed()
    }

    /// All test results, depth-first
    pub fn tests(&self) -> Vec<&TestCaseResult> {
        let mut tests = Vec::new();
        self.suite.collect_tests(&mut tests);
        tests
    }

    /// First test result with the given name
    pub fn test(&self, name: &str) -> Option<&TestCaseResult> {
        self.tests().into_iter().find(|t| t.name == name)
    }

    /// Format a summary line
    pub fn summary(&self) -> String {
        let stats = &self.suite.stats;
        format!(
            "{} critical tests, {} passed, {} failed; {} tests total, {} passed, {} failed ({}ms)",
            stats.critical,
            stats.critical_passed,
            stats.critical_failed(),
            stats.total,
            stats.total_passed,
            stats.total_failed(),
            self.duration.as_millis(),
        )
    }
}

/// Result of one suite
#[derive(Debug, Clone)]
pub struct SuiteResult {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub message: String,
    /// Counts of this suite and everything below it
    pub stats: Counts,
    pub tests: Vec<TestCaseResult>,
    pub suites: Vec<SuiteResult>,
    pub setup: Option<Keyword>,
    pub teardown: Option<Keyword>,
    pub elapsed: Duration,
}

impl SuiteResult {
    fn collect_tests<'a>(&'a self, into: &mut Vec<&'a TestCaseResult>) {
        into.extend(self.tests.iter());
        for suite in &self.suites {
            suite.collect_tests(into);
        }
    }

    fn suite_teardown_failed(&mut self, message: &str) {
        self.status = Status::Fail;
        for test in &mut self.tests {
            test.suite_teardown_failed(message);
        }
        for suite in &mut self.suites {
            suite.suite_teardown_failed(message);
        }
    }
}

/// Result of a single test case
#[derive(Debug, Clone)]
pub struct TestCaseResult {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub critical: bool,
    pub status: Status,
    /// Failure message, empty when the test passed
    pub message: String,
    pub setup: Option<Keyword>,
    /// Executed body steps with their results
    pub keywords: Vec<Keyword>,
    pub teardown: Option<Keyword>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl TestCaseResult {
    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }

    fn suite_teardown_failed(&mut self, message: &str) {
        self.status = Status::Fail;
        self.message = if self.message.is_empty() {
            format!("Parent suite teardown failed:\n{}", message)
        } else {
            format!("{}\n\nAlso parent suite teardown failed:\n{}", self.message, message)
        };
    }
}

/// Output used during a run: tracks location ids, records messages into
/// the text cache and forwards everything to the log and debug file.
struct RunOutput {
    level: LogLevel,
    location: Location,
    cache: TextCache,
    messages: Vec<Message>,
    errors: Vec<Message>,
    log: LogOutput,
    debug_file: Option<DebugFile>,
}

impl RunOutput {
    fn new(config: &RunConfig) -> Self {
        let mut errors = Vec::new();
        let debug_file = match &config.debug_file {
            Some(path) => match DebugFile::create(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    let text = format!("Opening debug file '{}' failed: {}", path.display(), e);
                    warn!("{}", text);
                    errors.push(Message {
                        id: String::new(),
                        level: LogLevel::Warn,
                        text,
                        text_id: 0,
                        timestamp: SystemTime::now(),
                    });
                    None
                }
            },
            None => None,
        };
        Self {
            level: config.log_level,
            location: Location::new(),
            cache: TextCache::with_threshold(config.text_cache_threshold),
            messages: Vec::new(),
            errors,
            log: LogOutput::new(config.log_level),
            debug_file,
        }
    }

    fn notify(&mut self, mut f: impl FnMut(&mut dyn Output)) {
        f(&mut self.log);
        if let Some(file) = self.debug_file.as_mut() {
            f(file);
        }
    }

    fn current_id(&self) -> String {
        self.location.current_id()
    }
}

impl Output for RunOutput {
    fn start_suite(&mut self, name: &str) {
        self.location.start_suite();
        self.notify(|o| o.start_suite(name));
    }

    fn end_suite(&mut self, name: &str, status: Status, message: &str) {
        self.notify(|o| o.end_suite(name, status, message));
        self.location.end_suite();
    }

    fn start_test(&mut self, name: &str) {
        self.location.start_test();
        self.notify(|o| o.start_test(name));
    }

    fn end_test(&mut self, name: &str, status: Status, message: &str) {
        self.notify(|o| o.end_test(name, status, message));
        self.location.end_test();
    }

    fn start_keyword(&mut self, kw: &KeywordEvent<'_>) {
        self.location.start_keyword();
        self.notify(|o| o.start_keyword(kw));
    }

    fn end_keyword(&mut self, kw: &KeywordEvent<'_>) {
        self.notify(|o| o.end_keyword(kw));
        self.location.end_keyword();
    }

    fn message(&mut self, level: LogLevel, text: &str) {
        let warning = level == LogLevel::Warn;
        if warning {
            warn!("{}", text);
        }
        let recorded = level >= self.level;
        if recorded || warning {
            let message = Message {
                id: self.current_id(),
                level,
                text: text.to_string(),
                text_id: self.cache.add(text),
                timestamp: SystemTime::now(),
            };
            if warning {
                self.errors.push(message.clone());
            }
            if recorded {
                self.messages.push(message);
            }
        }
        self.notify(|o| o.message(level, text));
    }
}

/// Mutable state threaded through one run
struct RunState {
    output: RunOutput,
    stats: Statistics,
    run_errors: SuiteRunErrors,
    criticality: Criticality,
}

/// The suite runner
pub struct SuiteRunner {
    namespace: Namespace,
    config: RunConfig,
}

impl SuiteRunner {
    /// Create a new runner with the BuiltIn library
    pub fn new(config: RunConfig) -> Self {
        Self {
            namespace: Namespace::new(),
            config,
        }
    }

    /// Create a new runner with a custom namespace
    pub fn with_namespace(namespace: Namespace, config: RunConfig) -> Self {
        Self { namespace, config }
    }

    /// Get mutable reference to the namespace (for importing libraries)
    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    /// Run a suite tree
    pub fn run(&self, suite: &TestSuite) -> RunResult {
        let start = Instant::now();
        let mut state = RunState {
            output: RunOutput::new(&self.config),
            stats: Statistics::new(),
            run_errors: SuiteRunErrors::new(self.config.exit_on_failure),
            criticality: Criticality::new(&self.config.critical, &self.config.non_critical),
        };

        let mut globals = Variables::with_identifiers(&self.config.identifiers, self.config.env.clone());
        set_builtin_variable(&mut globals, "${EMPTY}", Value::String(String::new()));
        set_builtin_variable(&mut globals, "@{EMPTY}", Value::List(Vec::new()));
        set_builtin_variable(&mut globals, "${SPACE}", Value::from(" "));
        if let Err(e) = globals.set_from_pairs(self.config.variables.clone(), true) {
            state.output.warn(&format!("Setting global variables failed: {}", e.message));
        }

        let result = self.run_suite(suite, &globals, None, &mut state);
        let RunOutput {
            cache,
            messages,
            errors,
            log,
            ..
        } = state.output;
        RunResult {
            suite: result,
            messages,
            strings: cache.dump(),
            errors,
            log: log.log,
            duration: start.elapsed(),
        }
    }

    fn run_suite(
        &self,
        suite: &TestSuite,
        parent_vars: &Variables,
        parent_failure: Option<&str>,
        st: &mut RunState,
    ) -> SuiteResult {
        let start = Instant::now();
        st.output.start_suite(&suite.name);
        let id = st.output.current_id();
        st.stats.collect();
        debug!(suite = %suite.name, id = %id, "starting suite");

        let mut vars = parent_vars.copy();
        set_builtin_variable(&mut vars, "${SUITE_NAME}", Value::from(suite.name.as_str()));
        for err in vars.set_from_variable_table(&suite.variables) {
            st.output.warn(&format!("Error in suite '{}': {}", suite.name, err.message));
        }

        let mut message = String::new();
        let mut setup = None;
        let mut child_failure = parent_failure.map(str::to_string);
        if let Some(failure) = parent_failure {
            message = failure.to_string();
        } else if let Some(keyword) = &suite.setup {
            let (executed, outcome) = self.run_fixture(keyword, &mut vars, st, None);
            setup = Some(executed);
            if let Err(err) = outcome {
                st.run_errors.test_failed(err.exit, false);
                message = format!("Suite setup failed:\n{}", err.message);
                child_failure = Some(format!("Parent suite setup failed:\n{}", err.message));
            }
        }

        let tests = suite
            .tests
            .iter()
            .map(|test| self.run_test(test, &vars, child_failure.as_deref(), st))
            .collect();
        let suites = suite
            .suites
            .iter()
            .map(|child| self.run_suite(child, &vars, child_failure.as_deref(), st))
            .collect();

        let mut result = SuiteResult {
            id,
            name: suite.name.clone(),
            status: Status::Pass,
            message,
            stats: Counts::default(),
            tests,
            suites,
            setup,
            teardown: None,
            elapsed: Duration::ZERO,
        };

        if parent_failure.is_none() {
            if let Some(keyword) = &suite.teardown {
                let (executed, outcome) = self.run_fixture(keyword, &mut vars, st, None);
                result.teardown = Some(executed);
                if let Err(err) = outcome {
                    st.run_errors.test_failed(err.exit, false);
                    st.stats.teardown_failed();
                    result.suite_teardown_failed(&err.message);
                    result.message = if result.message.is_empty() {
                        format!("Suite teardown failed:\n{}", err.message)
                    } else {
                        format!("{}\n\nAlso suite teardown failed:\n{}", result.message, err.message)
                    };
                }
            }
        }

        result.stats = st.stats.dump_current();
        if !result.message.is_empty() || result.stats.critical_failed() > 0 {
            result.status = Status::Fail;
        }
        result.elapsed = start.elapsed();
        st.output.end_suite(&suite.name, result.status, &result.message);
        result
    }

    fn run_test(
        &self,
        test: &TestCase,
        suite_vars: &Variables,
        parent_failure: Option<&str>,
        st: &mut RunState,
    ) -> TestCaseResult {
        let start = Instant::now();
        st.output.start_test(&test.name);
        let critical = st.criticality.test_is_critical(&test.tags);
        let mut result = TestCaseResult {
            id: st.output.current_id(),
            name: test.name.clone(),
            tags: test.tags.clone(),
            critical,
            status: Status::Fail,
            message: String::new(),
            setup: None,
            keywords: Vec::new(),
            teardown: None,
            timed_out: false,
            elapsed: Duration::ZERO,
        };

        if let Some(failure) = parent_failure {
            result.message = failure.to_string();
        } else if let Some(stopped) = st.run_errors.stop_message() {
            result.message = stopped.to_string();
        } else {
            self.execute_test(test, suite_vars, &mut result, st);
        }

        let passed = result.message.is_empty();
        if passed {
            result.status = Status::Pass;
        } else if parent_failure.is_none() {
            st.run_errors.test_failed(false, critical);
        }
        st.stats.add_current(critical, passed);
        result.elapsed = start.elapsed();
        debug!(test = %test.name, status = %result.status, "test finished");
        st.output.end_test(&test.name, result.status, &result.message);
        result
    }

    /// Run setup, body and teardown; failures end up in `result.message`.
    fn execute_test(&self, test: &TestCase, suite_vars: &Variables, result: &mut TestCaseResult, st: &mut RunState) {
        let mut vars = suite_vars.copy();
        set_builtin_variable(&mut vars, "${TEST_NAME}", Value::from(test.name.as_str()));
        let mut timeout = TestTimeout::new(test.timeout);
        timeout.start();

        let mut errors = Vec::new();
        let mut setup_passed = true;
        if let Some(keyword) = &test.setup {
            let (executed, outcome) = self.run_fixture(keyword, &mut vars, st, Some(&timeout));
            result.setup = Some(executed);
            if let Err(err) = outcome {
                st.run_errors.test_failed(err.exit, false);
                timeout.set_keyword_timeout(err.timeout);
                setup_passed = false;
                errors.push(ExecutionFailed {
                    message: format!("Setup failed:\n{}", err.message),
                    ..err
                });
            }
        }

        if setup_passed {
            let mut body = test.keywords.clone();
            let mut ctx = Context::new(&self.namespace, &mut vars, &mut st.output).with_timeout(&timeout);
            errors.extend(run_test_case_keywords(&mut body, &mut ctx, &mut st.run_errors));
            result.keywords = body;
        }

        let mut message = multiple_errors_message(&errors);
        if let Some(keyword) = &test.teardown {
            let (executed, outcome) = self.run_fixture(keyword, &mut vars, st, None);
            result.teardown = Some(executed);
            if let Err(err) = outcome {
                st.run_errors.test_failed(err.exit, false);
                message = if message.is_empty() {
                    format!("Teardown failed:\n{}", err.message)
                } else {
                    format!("{}\n\nAlso teardown failed:\n{}", message, err.message)
                };
            }
        }

        result.timed_out = timeout.keyword_timeout_occurred() || errors.iter().any(|e| e.timeout);
        result.message = message;
    }

    /// Run a setup or teardown keyword on a copy of its definition.
    fn run_fixture(
        &self,
        keyword: &Keyword,
        vars: &mut Variables,
        st: &mut RunState,
        timeout: Option<&TestTimeout>,
    ) -> (Keyword, Result<(), ExecutionFailed>) {
        let mut executed = keyword.clone();
        let mut ctx = Context::new(&self.namespace, vars, &mut st.output);
        if let Some(timeout) = timeout {
            ctx = ctx.with_timeout(timeout);
        }
        let outcome = executed.run(&mut ctx).map(|_| ());
        (executed, outcome)
    }
}

fn set_builtin_variable(vars: &mut Variables, name: &str, value: Value) {
    if let Err(e) = vars.set(name, value) {
        debug!("setting {} failed: {}", name, e.message);
    }
}

/// Builder API for convenient runner construction
pub struct RunnerBuilder {
    config: RunConfig,
    namespace: Option<Namespace>,
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            namespace: None,
        }
    }

    /// Add a critical tag pattern
    pub fn critical(mut self, pattern: impl Into<String>) -> Self {
        self.config.critical.push(pattern.into());
        self
    }

    /// Add a non-critical tag pattern
    pub fn non_critical(mut self, pattern: impl Into<String>) -> Self {
        self.config.non_critical.push(pattern.into());
        self
    }

    /// Set the minimum level of recorded messages
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Stop after the first critical failure
    pub fn exit_on_failure(mut self, exit: bool) -> Self {
        self.config.exit_on_failure = exit;
        self
    }

    /// Write a debug file
    pub fn debug_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.debug_file = Some(path.into());
        self
    }

    /// Set the variable identifier characters
    pub fn identifiers(mut self, identifiers: &[char]) -> Self {
        self.config.identifiers = identifiers.to_vec();
        self
    }

    /// Set the text cache compression threshold
    pub fn text_cache_threshold(mut self, threshold: usize) -> Self {
        self.config.text_cache_threshold = threshold;
        self
    }

    /// Add a global variable (`LIST__name` for a list)
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.variables.push((name.into(), value.into()));
        self
    }

    /// Use a custom environment provider
    pub fn env(mut self, env: Arc<dyn EnvProvider>) -> Self {
        self.config.env = env;
        self
    }

    /// Use a custom namespace
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Import a library into the namespace
    pub fn library(mut self, library: Library) -> Self {
        self.namespace.get_or_insert_with(Namespace::new).import_library(library);
        self
    }

    /// Build and return the runner
    pub fn build(self) -> SuiteRunner {
        match self.namespace {
            Some(namespace) => SuiteRunner::with_namespace(namespace, self.config),
            None => SuiteRunner::new(self.config),
        }
    }

    /// Build and run a suite
    pub fn run(self, suite: &TestSuite) -> RunResult {
        self.build().run(suite)
    }
}

/// Convenience function: create a runner builder
pub fn runner() -> RunnerBuilder {
    RunnerBuilder::new()
}

/// Run a suite and integrate with `#[test]` by panicking on failure.
///
/// Set `KEYWORD_VERBOSE` to print the execution log.
pub fn run_and_assert(suite: &TestSuite) {
    run_and_assert_with(suite, |_| {});
}

/// Like `run_and_assert` but allows namespace customization.
pub fn run_and_assert_with(suite: &TestSuite, customize: impl FnOnce(&mut Namespace)) {
    let mut namespace = Namespace::new();
    customize(&mut namespace);
    let runner = SuiteRunner::with_namespace(namespace, RunConfig::default());
    let result = runner.run(suite);

    if std::env::var("KEYWORD_VERBOSE").is_ok() {
        eprintln!("{}", result.log);
    }
    for case in result.tests() {
        if case.passed() {
            eprintln!("PASS  {} ({}ms)", case.name, case.elapsed.as_millis());
        } else {
            eprintln!("FAIL  {}", case.name);
            for line in case.message.lines() {
                eprintln!("  {}", line);
            }
        }
    }

    eprintln!("\n{}", result.summary());

    if !result.all_passed() {
        panic!("{} critical test(s) failed", result.critical_failed_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::FnHandler;

    fn kw(name: &str, args: &[&str]) -> Keyword {
        Keyword::plain(name, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_passing_and_failing_tests() {
        let suite = TestSuite::new("Suite")
            .test(TestCase::new("Good").step(kw("Log", &["hello"])))
            .test(TestCase::new("Bad").step(kw("Fail", &["nope"])).step(kw("Log", &["unreached"])));
        let result = runner().run(&suite);

        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.all_passed());
        let bad = result.test("Bad").unwrap();
        assert_eq!(bad.status, Status::Fail);
        assert_eq!(bad.message, "nope");
        assert_eq!(bad.keywords[1].status(), Status::NotRun);
        assert_eq!(result.suite.status, Status::Fail);
        assert!(!result.log.contains("unreached"));
    }

    #[test]
    fn test_ids_and_messages() {
        let suite = TestSuite::new("Top")
            .test(TestCase::new("One").step(kw("Log", &["first"])))
            .suite(TestSuite::new("Child").test(TestCase::new("Two").step(kw("Log", &["second"]))));
        let result = runner().run(&suite);

        assert_eq!(result.suite.id, "s1");
        assert_eq!(result.suite.suites[0].id, "s1-s1");
        assert_eq!(result.tests()[0].id, "s1-t1");
        assert_eq!(result.tests()[1].id, "s1-s1-t1");
        let ids: Vec<&str> = result.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-t1-k1", "s1-s1-t1-k1"]);
        let first = &result.messages[0];
        assert_eq!(result.strings[first.text_id], "*first");
    }

    #[test]
    fn test_continuable_failures_collected() {
        let suite = TestSuite::new("Suite").test(
            TestCase::new("T")
                .step(kw("Run Keyword And Continue On Failure", &["Fail", "one"]))
                .step(kw("Run Keyword And Continue On Failure", &["Fail", "two"]))
                .step(kw("Log", &["still here"])),
        );
        let result = runner().run(&suite);
        let test = &result.tests()[0];
        assert_eq!(test.message, "Several failures occurred:\n\n1) one\n\n2) two");
        assert!(result.log.contains("still here"));
    }

    #[test]
    fn test_suite_setup_failure() {
        let suite = TestSuite::new("Suite")
            .with_setup(kw("Fail", &["setup broke"]))
            .with_teardown(kw("Log", &["teardown ran"]))
            .test(TestCase::new("A").step(kw("Log", &["never"])))
            .suite(TestSuite::new("Child").test(TestCase::new("B")));
        let result = runner().run(&suite);

        assert_eq!(result.suite.message, "Suite setup failed:\nsetup broke");
        for test in result.tests() {
            assert_eq!(test.message, "Parent suite setup failed:\nsetup broke");
        }
        assert_eq!(result.failed_count(), 2);
        assert!(result.log.contains("teardown ran"));
        assert!(!result.log.contains("never"));
    }

    #[test]
    fn test_suite_teardown_failure() {
        let suite = TestSuite::new("Suite")
            .with_teardown(kw("Fail", &["cleanup broke"]))
            .test(TestCase::new("A"))
            .test(TestCase::new("B").step(kw("Fail", &["own"])))
            .suite(TestSuite::new("Child").test(TestCase::new("C")));
        let result = runner().run(&suite);

        assert_eq!(result.suite.stats.total, 3);
        assert_eq!(result.suite.stats.total_passed, 0);
        assert_eq!(result.test("A").unwrap().message, "Parent suite teardown failed:\ncleanup broke");
        assert_eq!(
            result.test("B").unwrap().message,
            "own\n\nAlso parent suite teardown failed:\ncleanup broke"
        );
        assert_eq!(result.suite.suites[0].status, Status::Fail);
        assert_eq!(result.suite.message, "Suite teardown failed:\ncleanup broke");
    }

    #[test]
    fn test_test_setup_and_teardown() {
        let suite = TestSuite::new("Suite")
            .test(
                TestCase::new("Setup fails")
                    .with_setup(kw("Fail", &["no"]))
                    .with_teardown(kw("Log", &["td"]))
                    .step(kw("Log", &["body"])),
            )
            .test(TestCase::new("Teardown fails").step(kw("Fail", &["body"])).with_teardown(kw("Fail", &["td"])));
        let result = runner().run(&suite);

        let first = result.test("Setup fails").unwrap();
        assert_eq!(first.message, "Setup failed:\nno");
        assert!(first.keywords.is_empty());
        assert_eq!(first.teardown.as_ref().unwrap().status(), Status::Pass);
        let second = result.test("Teardown fails").unwrap();
        assert_eq!(second.message, "body\n\nAlso teardown failed:\ntd");
    }

    #[test]
    fn test_fatal_error_stops_run() {
        let suite = TestSuite::new("Suite")
            .test(TestCase::new("Fatal").step(kw("Fatal Error", &["stop"])))
            .test(TestCase::new("Later").step(kw("No Operation", &[])));
        let result = runner().run(&suite);
        let later = result.test("Later").unwrap();
        assert_eq!(later.message, "Test execution stopped due to a fatal error.");
        assert!(later.keywords.is_empty());
    }

    #[test]
    fn test_exit_on_failure_and_criticality() {
        let suite = TestSuite::new("Suite")
            .test(TestCase::new("Minor").with_tags(&["wip"]).step(kw("Fail", &["x"])))
            .test(TestCase::new("Major").step(kw("Fail", &["y"])))
            .test(TestCase::new("Skipped"));
        let result = runner().non_critical("WIP").exit_on_failure(true).run(&suite);

        assert!(!result.test("Minor").unwrap().critical);
        assert_eq!(result.test("Major").unwrap().message, "y");
        assert_eq!(
            result.test("Skipped").unwrap().message,
            "Critical failure occurred and exit-on-failure mode is in use."
        );
        assert_eq!(result.suite.stats.critical, 2);
    }

    #[test]
    fn test_variable_scopes() {
        let suite = TestSuite::new("Suite")
            .variable("${greeting}", &["Hello"])
            .variable("${bad", &["x"])
            .test(
                TestCase::new("Assign")
                    .step(Keyword::set(vec!["${local}".into()], "Catenate", vec!["${greeting}".into(), "${who}".into()]))
                    .step(kw("Should Be Equal", &["${local}", "Hello world"]))
                    .step(kw("Should Be Equal", &["${TEST_NAME}", "Assign"])),
            )
            .test(TestCase::new("Isolated").step(kw("Variable Should Exist", &["$local"])));
        let result = runner().variable("who", "world").run(&suite);

        assert!(result.test("Assign").unwrap().passed());
        assert_eq!(result.test("Isolated").unwrap().message, "Variable ${local} does not exist");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].text.starts_with("Error in suite 'Suite': Setting variable '${bad' failed"));
    }

    #[test]
    fn test_timeout_marks_test() {
        let lib = Library::new("Slow").with(
            "Sleep A Bit",
            FnHandler::new("Sleeps", "", |_, _| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(Value::None)
            }),
        );
        let suite = TestSuite::new("Suite").test(
            TestCase::new("Slow")
                .with_timeout(Duration::from_millis(1))
                .step(kw("Sleep A Bit", &[]))
                .step(kw("Log", &["after"])),
        );
        let result = runner().library(lib).run(&suite);
        let test = &result.tests()[0];
        assert!(test.timed_out);
        assert!(test.message.starts_with("Test timeout"));
        assert_eq!(test.keywords[1].status(), Status::NotRun);
    }

    #[test]
    fn test_summary() {
        let suite = TestSuite::new("Suite").test(TestCase::new("A"));
        let result = runner().run(&suite);
        assert!(result.summary().starts_with("1 critical tests, 1 passed, 0 failed; 1 tests total, 1 passed, 0 failed"));
    }
}
