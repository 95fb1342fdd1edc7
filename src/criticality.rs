//! Which tests count as critical

use crate::utils::Matcher;

/// Critical and non-critical tag patterns
#[derive(Debug, Clone, Default)]
pub struct Criticality {
    critical: Vec<Matcher>,
    non_critical: Vec<Matcher>,
}

impl Criticality {
    pub fn new<S: AsRef<str>>(critical: &[S], non_critical: &[S]) -> Self {
        Self {
            critical: critical.iter().map(|p| Matcher::new(p.as_ref())).collect(),
            non_critical: non_critical.iter().map(|p| Matcher::new(p.as_ref())).collect(),
        }
    }

    /// A test is critical unless a tag matches a non-critical pattern and,
    /// when critical patterns are given, some tag matches one of them.
    pub fn test_is_critical(&self, tags: &[String]) -> bool {
        if self.non_critical.iter().any(|m| m.matches_any(tags)) {
            return false;
        }
        self.critical.is_empty() || self.critical.iter().any(|m| m.matches_any(tags))
    }
}
