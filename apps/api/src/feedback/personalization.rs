//! Personalization Aggregator — turns a teacher's feedback history into a short
//! hint block for the prompt.
//!
//! Good/ok feedback contributes the values, specificity, time budget and subject
//! of the rated intake ("commonly chosen"). Bad feedback contributes its
//! deficiency reasons ("tends to avoid"). Ties keep first-seen order.

use crate::models::records::{FeedbackEntry, Rating};

/// Entries surfaced per category.
pub const TOP_PER_CATEGORY: usize = 2;

/// Insertion-ordered frequency count.
#[derive(Debug, Default)]
struct Tally {
    counts: Vec<(&'static str, usize)>,
}

impl Tally {
    fn add(&mut self, key: &'static str) {
        if key.is_empty() {
            return;
        }
        match self.counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((key, 1)),
        }
    }

    /// The `n` most frequent keys. The sort is stable, so ties stay in first-seen order.
    fn top(&self, n: usize) -> Vec<&'static str> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(n).map(|(key, _)| key).collect()
    }
}

/// Builds the hint block. Returns an empty string when there is nothing to say.
pub fn build_hints(history: &[FeedbackEntry]) -> String {
    let mut values = Tally::default();
    let mut specificity = Tally::default();
    let mut time_budget = Tally::default();
    let mut subject = Tally::default();
    let mut avoided = Tally::default();

    for entry in history {
        match entry.feedback.rating {
            Rating::Good | Rating::Ok => {
                let Some(intake) = &entry.intake else {
                    continue;
                };
                for value in &intake.values {
                    values.add(value.label());
                }
                specificity.add(intake.specificity.label());
                if let Some(t) = intake.time_budget {
                    time_budget.add(t.label());
                }
                if let Some(s) = intake.subject {
                    subject.add(s.label());
                }
            }
            Rating::Bad => {
                for reason in &entry.feedback.reasons {
                    avoided.add(reason.label());
                }
            }
        }
    }

    let lines: Vec<String> = [
        ("よく選ばれる価値観", &values),
        ("よく選ばれる具体度", &specificity),
        ("よく選ばれる時間制約", &time_budget),
        ("よく選ばれる教科", &subject),
        ("避けたい傾向（過去の不足指摘）", &avoided),
    ]
    .into_iter()
    .filter_map(|(heading, tally)| {
        let top = tally.top(TOP_PER_CATEGORY);
        (!top.is_empty()).then(|| format!("- {}: {}", heading, top.join(" / ")))
    })
    .collect();

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::intake::tests::complete_form;
    use crate::models::intake::{CoreValue, Intake, Specificity, Subject, TimeBudget};
    use crate::models::records::{DeficiencyReason, FeedbackRecord};

    fn intake_with(values: &[CoreValue]) -> Intake {
        let mut intake = complete_form().validate().unwrap();
        intake.values = values.to_vec();
        intake.time_budget = None;
        intake
    }

    fn entry(rating: Rating, reasons: &[DeficiencyReason], intake: Option<Intake>) -> FeedbackEntry {
        FeedbackEntry {
            feedback: FeedbackRecord {
                id: Uuid::new_v4(),
                interaction_id: Uuid::new_v4(),
                org_id: Uuid::nil(),
                user_id: Uuid::nil(),
                rating,
                reasons: reasons.to_vec(),
                note: String::new(),
                created_at: Utc::now(),
            },
            intake,
        }
    }

    #[test]
    fn test_empty_history_yields_empty_hints() {
        assert_eq!(build_hints(&[]), "");
    }

    #[test]
    fn test_preferred_value_and_avoided_reason() {
        let history = vec![
            entry(Rating::Good, &[], Some(intake_with(&[CoreValue::FosterAutonomy]))),
            entry(Rating::Good, &[], Some(intake_with(&[CoreValue::FosterAutonomy]))),
            entry(Rating::Bad, &[DeficiencyReason::TooAbstract], None),
        ];
        let hints = build_hints(&history);
        assert!(hints.contains("よく選ばれる価値観: 子どもの主体性を育てたい"));
        assert!(hints.contains("避けたい傾向（過去の不足指摘）: 抽象的すぎる"));
    }

    #[test]
    fn test_bad_feedback_values_are_not_preferences() {
        let history = vec![entry(
            Rating::Bad,
            &[],
            Some(intake_with(&[CoreValue::StretchTasks])),
        )];
        assert_eq!(build_hints(&history), "");
    }

    #[test]
    fn test_top_two_with_first_seen_tie_break() {
        let history = vec![
            entry(Rating::Ok, &[], Some(intake_with(&[CoreValue::ListenClosely]))),
            entry(Rating::Ok, &[], Some(intake_with(&[CoreValue::PraiseProcess]))),
            entry(Rating::Ok, &[], Some(intake_with(&[CoreValue::EmbraceFailure]))),
            entry(Rating::Good, &[], Some(intake_with(&[CoreValue::EmbraceFailure]))),
        ];
        let hints = build_hints(&history);
        // EmbraceFailure leads on count; ListenClosely beats PraiseProcess on first-seen
        assert!(hints.contains("よく選ばれる価値観: 失敗を受け止めたい / 相手の話に耳を傾けたい"));
        assert!(!hints.contains("プロセスを褒めたい"));
    }

    #[test]
    fn test_unspecified_subject_and_time_are_skipped() {
        let history = vec![entry(Rating::Good, &[], Some(intake_with(&[])))];
        let hints = build_hints(&history);
        assert!(hints.contains("よく選ばれる具体度: 標準"));
        assert!(!hints.contains("よく選ばれる時間制約"));
        assert!(!hints.contains("よく選ばれる教科"));
        assert!(!hints.contains("よく選ばれる価値観"));
    }

    #[test]
    fn test_subject_time_and_specificity_counted() {
        let mut a = intake_with(&[]);
        a.subject = Some(Subject::Math);
        a.time_budget = Some(TimeBudget::Minutes5);
        a.specificity = Specificity::High;
        let mut b = a.clone();
        b.subject = Some(Subject::English);
        let history = vec![
            entry(Rating::Good, &[], Some(a.clone())),
            entry(Rating::Ok, &[], Some(b)),
            entry(Rating::Good, &[], Some(a)),
        ];
        let hints = build_hints(&history);
        assert!(hints.contains("よく選ばれる教科: 算数/数学 / 英語"));
        assert!(hints.contains("よく選ばれる時間制約: ~5分"));
        assert!(hints.contains("よく選ばれる具体度: 高め（超具体）"));
    }

    #[test]
    fn test_hints_are_deterministic() {
        let history = vec![
            entry(Rating::Bad, &[DeficiencyReason::DoesNotFitTime, DeficiencyReason::WeakEvidence], None),
            entry(Rating::Bad, &[DeficiencyReason::WeakEvidence], None),
            entry(Rating::Good, &[], Some(intake_with(&[CoreValue::SafeAtmosphere]))),
        ];
        let first = build_hints(&history);
        assert_eq!(first, build_hints(&history));
        assert!(first.contains("根拠が薄い / 時間に合わない"));
    }
}
