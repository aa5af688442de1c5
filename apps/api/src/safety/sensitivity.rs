use crate::safety::patterns::PatternSet;

/// Flags narratives that may involve harm to a child.
///
/// High recall by construction: a false positive only adds the triage step,
/// a false negative skips the safety block entirely.
#[derive(Debug, Clone)]
pub struct SensitivityClassifier {
    patterns: PatternSet,
}

impl SensitivityClassifier {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// True if any sensitive pattern occurs anywhere in `text`.
    pub fn is_sensitive(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::patterns::{SafetyLexicon, SENSITIVE_PATTERNS};

    fn classifier() -> SensitivityClassifier {
        SafetyLexicon::default().compile().unwrap().sensitivity
    }

    #[test]
    fn test_empty_text_is_not_sensitive() {
        assert!(!classifier().is_sensitive(""));
    }

    #[test]
    fn test_bullying_is_sensitive() {
        assert!(classifier().is_sensitive("クラスでいじめがあるようです"));
    }

    #[test]
    fn test_conjugated_forms_match() {
        let c = classifier();
        assert!(c.is_sensitive("からかいがいじりに発展している"));
        assert!(c.is_sensitive("友達を殴ってしまった"));
        assert!(c.is_sensitive("お金を要求されている"));
        assert!(c.is_sensitive("性的な発言が続いている"));
    }

    #[test]
    fn test_self_harm_is_sensitive() {
        let c = classifier();
        assert!(c.is_sensitive("「死にたい」と日記に書いていた"));
        assert!(c.is_sensitive("自傷の跡が見える"));
    }

    #[test]
    fn test_ordinary_classroom_issue_is_not_sensitive() {
        let c = classifier();
        assert!(!c.is_sensitive("授業中に立ち歩く児童がいる"));
        assert!(!c.is_sensitive("宿題の提出が遅れがちです"));
    }

    #[test]
    fn test_every_listed_pattern_triggers() {
        let c = classifier();
        // literal patterns must trigger on their own text
        for pattern in SENSITIVE_PATTERNS
            .iter()
            .filter(|p| !p.contains(['(', '|', '.', '*']))
        {
            let narrative = format!("最近、{}が気になります", pattern);
            assert!(c.is_sensitive(&narrative), "pattern {pattern} did not trigger");
        }
    }

    #[test]
    fn test_match_anywhere_in_long_text() {
        let mut narrative = "普段は落ち着いたクラスです。".repeat(50);
        narrative.push_str("ただ陰口が増えてきた。");
        assert!(classifier().is_sensitive(&narrative));
    }
}
