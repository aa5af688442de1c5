use crate::safety::patterns::PatternSet;

/// Checks generated advice against the forbidden-phrase list.
#[derive(Debug, Clone)]
pub struct ComplianceChecker {
    patterns: PatternSet,
}

impl ComplianceChecker {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// True if any forbidden pattern occurs in `text`.
    pub fn violates_policy(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }

    /// Patterns matched by `text`, for logging.
    pub fn violations<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.patterns.matching(text)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
