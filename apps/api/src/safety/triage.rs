//! Safety assessment — decides whether safety mode applies and collects the
//! three triage answers it requires.

use serde::{Deserialize, Serialize};

use crate::safety::sensitivity::SensitivityClassifier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriageAnswer {
    Yes,
    No,
    Unknown,
}

impl TriageAnswer {
    pub fn label(self) -> &'static str {
        match self {
            TriageAnswer::Yes => "はい",
            TriageAnswer::No => "いいえ",
            TriageAnswer::Unknown => "不明",
        }
    }
}

/// The fixed triage questions, keyed as they appear on the wire.
pub const TRIAGE_QUESTIONS: [(&str, &str); 3] = [
    ("q1", "継続的な標的化や危害が現在ありますか？"),
    ("q2", "学校の定めた報告フローに報告済みですか？"),
    ("q3", "被害が想定される子の安全確保は取れていますか？"),
];

/// Triage answers as submitted; any of them may be skipped.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TriageForm {
    pub q1: Option<TriageAnswer>,
    pub q2: Option<TriageAnswer>,
    pub q3: Option<TriageAnswer>,
}

/// Complete triage answers: Q1 ongoing targeting, Q2 reported through the
/// school channel, Q3 victim safety secured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriageAnswers {
    pub q1: TriageAnswer,
    pub q2: TriageAnswer,
    pub q3: TriageAnswer,
}

/// What to do when safety mode is on but some triage answers were skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriageFallback {
    /// Reject the submission until every question is answered.
    #[default]
    Require,
    /// Fill skipped answers with the least reassuring value:
    /// Q1 unknown, Q2 not reported, Q3 safety not secured.
    AssumeUnsafe,
}

impl TriageFallback {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "require" => Some(TriageFallback::Require),
            "assume_unsafe" => Some(TriageFallback::AssumeUnsafe),
            _ => None,
        }
    }
}

/// Safety mode was triggered but required triage answers are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageMissing {
    pub missing: Vec<&'static str>,
    pub auto_detected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SafetyAssessment {
    pub needs_safety: bool,
    /// The narrative itself tripped the sensitivity check.
    pub auto_detected: bool,
    pub triage: Option<TriageAnswers>,
}

impl SafetyAssessment {
    pub fn not_required() -> Self {
        Self {
            needs_safety: false,
            auto_detected: false,
            triage: None,
        }
    }
}

/// Returns `(needs_safety, auto_detected)` without looking at triage answers.
pub fn detect(
    classifier: &SensitivityClassifier,
    checkbox: bool,
    narrative: &str,
) -> (bool, bool) {
    let auto_detected = classifier.is_sensitive(narrative);
    (checkbox || auto_detected, auto_detected)
}

/// Computes the safety assessment for one submission.
///
/// When safety mode applies, skipped triage answers are handled per `fallback`.
/// Answers supplied while safety mode is off are ignored.
pub fn assess(
    classifier: &SensitivityClassifier,
    checkbox: bool,
    narrative: &str,
    form: TriageForm,
    fallback: TriageFallback,
) -> Result<SafetyAssessment, TriageMissing> {
    let (needs_safety, auto_detected) = detect(classifier, checkbox, narrative);
    if !needs_safety {
        return Ok(SafetyAssessment::not_required());
    }

    let triage = match (form.q1, form.q2, form.q3, fallback) {
        (Some(q1), Some(q2), Some(q3), _) => TriageAnswers { q1, q2, q3 },
        (q1, q2, q3, TriageFallback::AssumeUnsafe) => TriageAnswers {
            q1: q1.unwrap_or(TriageAnswer::Unknown),
            q2: q2.unwrap_or(TriageAnswer::No),
            q3: q3.unwrap_or(TriageAnswer::No),
        },
        (q1, q2, q3, TriageFallback::Require) => {
            let missing = [("q1", q1), ("q2", q2), ("q3", q3)]
                .into_iter()
                .filter(|(_, answer)| answer.is_none())
                .map(|(key, _)| key)
                .collect();
            return Err(TriageMissing {
                missing,
                auto_detected,
            });
        }
    };

    Ok(SafetyAssessment {
        needs_safety,
        auto_detected,
        triage: Some(triage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::patterns::SafetyLexicon;

    fn classifier() -> SensitivityClassifier {
        SafetyLexicon::default().compile().unwrap().sensitivity
    }

    fn answered() -> TriageForm {
        TriageForm {
            q1: Some(TriageAnswer::Yes),
            q2: Some(TriageAnswer::No),
            q3: Some(TriageAnswer::Yes),
        }
    }

    #[test]
    fn test_no_safety_without_checkbox_or_keyword() {
        let a = assess(
            &classifier(),
            false,
            "授業中の私語が多い",
            TriageForm::default(),
            TriageFallback::Require,
        )
        .unwrap();
        assert_eq!(a, SafetyAssessment::not_required());
    }

    #[test]
    fn test_triage_ignored_when_safety_off() {
        let a = assess(
            &classifier(),
            false,
            "授業中の私語が多い",
            answered(),
            TriageFallback::Require,
        )
        .unwrap();
        assert!(a.triage.is_none());
    }

    #[test]
    fn test_keyword_triggers_safety_without_checkbox() {
        let a = assess(
            &classifier(),
            false,
            "グループ内でいじめが疑われる",
            answered(),
            TriageFallback::Require,
        )
        .unwrap();
        assert!(a.needs_safety);
        assert!(a.auto_detected);
        assert_eq!(a.triage.unwrap().q1, TriageAnswer::Yes);
    }

    #[test]
    fn test_checkbox_triggers_safety_without_keyword() {
        let a = assess(
            &classifier(),
            true,
            "様子が少し気になる",
            answered(),
            TriageFallback::Require,
        )
        .unwrap();
        assert!(a.needs_safety);
        assert!(!a.auto_detected);
    }

    #[test]
    fn test_require_fallback_rejects_skipped_answers() {
        let err = assess(
            &classifier(),
            false,
            "いじめの相談です",
            TriageForm {
                q1: Some(TriageAnswer::Unknown),
                q2: None,
                q3: None,
            },
            TriageFallback::Require,
        )
        .unwrap_err();
        assert_eq!(err.missing, vec!["q2", "q3"]);
        assert!(err.auto_detected);
    }

    #[test]
    fn test_assume_unsafe_fallback_fills_least_reassuring_answers() {
        let a = assess(
            &classifier(),
            true,
            "",
            TriageForm {
                q1: None,
                q2: Some(TriageAnswer::Yes),
                q3: None,
            },
            TriageFallback::AssumeUnsafe,
        )
        .unwrap();
        assert_eq!(
            a.triage,
            Some(TriageAnswers {
                q1: TriageAnswer::Unknown,
                q2: TriageAnswer::Yes,
                q3: TriageAnswer::No,
            })
        );
    }

    #[test]
    fn test_fallback_parse() {
        assert_eq!(TriageFallback::parse("require"), Some(TriageFallback::Require));
        assert_eq!(
            TriageFallback::parse("assume_unsafe"),
            Some(TriageFallback::AssumeUnsafe)
        );
        assert_eq!(TriageFallback::parse("skip"), None);
    }
}
