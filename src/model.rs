//! Test data model: suites and test cases as handed over by a parser

use std::time::Duration;

use crate::keywords::Keyword;

/// A test case
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub name: String,
    pub doc: String,
    pub tags: Vec<String>,
    pub setup: Option<Keyword>,
    pub keywords: Vec<Keyword>,
    pub teardown: Option<Keyword>,
    pub timeout: Option<Duration>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_setup(mut self, setup: Keyword) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn with_teardown(mut self, teardown: Keyword) -> Self {
        self.teardown = Some(teardown);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a step to the body
    pub fn step(mut self, keyword: Keyword) -> Self {
        self.keywords.push(keyword);
        self
    }
}

/// A suite: its own variables and fixtures, tests and child suites
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    pub name: String,
    pub doc: String,
    /// Variable table rows, `(name, raw values)`
    pub variables: Vec<(String, Vec<String>)>,
    pub setup: Option<Keyword>,
    pub teardown: Option<Keyword>,
    pub tests: Vec<TestCase>,
    pub suites: Vec<TestSuite>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn variable(mut self, name: &str, values: &[&str]) -> Self {
        self.variables
            .push((name.to_string(), values.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn with_setup(mut self, setup: Keyword) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn with_teardown(mut self, teardown: Keyword) -> Self {
        self.teardown = Some(teardown);
        self
    }

    pub fn test(mut self, test: TestCase) -> Self {
        self.tests.push(test);
        self
    }

    pub fn suite(mut self, suite: TestSuite) -> Self {
        self.suites.push(suite);
        self
    }

    /// Number of tests in this suite and all child suites
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.suites.iter().map(TestSuite::test_count).sum::<usize>()
    }
}
