//! Hierarchical position ids
//!
//! Tracks where the run currently is as `s1-s2-t3-k1`: one `<level><n>`
//! part per open suite, test and keyword, numbered from 1 within the
//! parent.

/// Cursor producing ids for suites, tests and keywords
#[derive(Debug, Clone)]
pub struct Location {
    ids: Vec<String>,
    suite_indices: Vec<usize>,
    test_indices: Vec<usize>,
    kw_indices: Vec<usize>,
}

impl Default for Location {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Level {
    Suite,
    Test,
    Keyword,
}

impl Location {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            suite_indices: vec![0],
            test_indices: vec![0],
            kw_indices: vec![0],
        }
    }

    pub fn start_suite(&mut self) -> String {
        self.start('s', Level::Suite)
    }

    pub fn start_test(&mut self) -> String {
        self.start('t', Level::Test)
    }

    pub fn start_keyword(&mut self) -> String {
        self.start('k', Level::Keyword)
    }

    pub fn end_suite(&mut self) {
        self.end(Level::Suite);
    }

    pub fn end_test(&mut self) {
        self.end(Level::Test);
    }

    pub fn end_keyword(&mut self) {
        self.end(Level::Keyword);
    }

    /// Counter stacks affected when entering or leaving `level`, own level first.
    fn stacks(&mut self, level: Level) -> Vec<&mut Vec<usize>> {
        match level {
            Level::Suite => vec![&mut self.suite_indices, &mut self.test_indices, &mut self.kw_indices],
            Level::Test => vec![&mut self.test_indices, &mut self.kw_indices],
            Level::Keyword => vec![&mut self.kw_indices],
        }
    }

    fn start(&mut self, prefix: char, level: Level) -> String {
        let mut stacks = self.stacks(level);
        let index = match stacks[0].last_mut() {
            Some(counter) => {
                *counter += 1;
                *counter
            }
            None => 1,
        };
        for stack in stacks.iter_mut() {
            stack.push(0);
        }
        self.ids.push(format!("{}{}", prefix, index));
        self.current_id()
    }

    fn end(&mut self, level: Level) {
        self.ids.pop();
        for stack in self.stacks(level) {
            stack.pop();
        }
    }

    /// Whether the innermost open item is a test
    pub fn on_test_level(&self) -> bool {
        self.ids.last().map_or(false, |id| id.starts_with('t'))
    }

    /// Id of the innermost open item, e.g. `s1-t2-k1`
    pub fn current_id(&self) -> String {
        self.ids.join("-")
    }
}
