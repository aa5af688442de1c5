//! Dashboard KPIs — pure aggregation over one window of interaction and feedback records.
//!
//! Every rate is a percentage rounded to one decimal. Empty denominators count
//! as one, so an empty window reports 0 rather than NaN (time-fit and
//! policy-compliance therefore report 100 on no data).

use serde::Serialize;

use crate::models::policy::Policy;
use crate::models::records::{DeficiencyReason, FeedbackRecord, InteractionRecord, Rating};

/// Windows the dashboard accepts, in days.
pub const WINDOW_DAYS: [u32; 3] = [7, 28, 90];
pub const DEFAULT_WINDOW_DAYS: u32 = 28;
/// Topic rows reported, most frequent first.
pub const TOP_TOPICS: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub days: u32,
    pub interactions: usize,
    pub feedback: usize,
    /// Consultations per active teacher per week. The primary KPI.
    pub weekly_actions_per_teacher: f64,
    pub helpful_rate: f64,
    pub regeneration_rate: f64,
    pub time_fit_rate: f64,
    pub sensitive_rate: f64,
    pub policy_compliance_rate: f64,
    pub top_topics: Vec<TopicCount>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn percent(numerator: usize, denominator: usize) -> f64 {
    round_to(100.0 * numerator as f64 / denominator.max(1) as f64, 1)
}

/// Computes the summary for records already filtered to one organization and window.
pub fn compute_dashboard(
    days: u32,
    interactions: &[InteractionRecord],
    feedback: &[FeedbackRecord],
    policy: &Policy,
) -> DashboardSummary {
    let mut teachers: Vec<_> = interactions.iter().map(|i| i.user_id).collect();
    teachers.sort();
    teachers.dedup();
    let weeks = (f64::from(days) / 7.0).max(1.0);
    let weekly_actions_per_teacher = round_to(
        interactions.len() as f64 / teachers.len().max(1) as f64 / weeks,
        2,
    );

    let helpful = feedback.iter().filter(|f| f.rating == Rating::Good).count();

    let regenerated = interactions
        .iter()
        .filter(|i| i.compliance.regenerated())
        .count();

    let time_misfit = feedback
        .iter()
        .filter(|f| f.reasons.contains(&DeficiencyReason::DoesNotFitTime))
        .count();

    let sensitive = interactions.iter().filter(|i| i.sensitive_flag).count();

    let off_policy = interactions
        .iter()
        .filter(|i| policy.contains_avoid_phrase(&i.final_text))
        .count();

    DashboardSummary {
        days,
        interactions: interactions.len(),
        feedback: feedback.len(),
        weekly_actions_per_teacher,
        helpful_rate: percent(helpful, feedback.len()),
        regeneration_rate: percent(regenerated, interactions.len()),
        time_fit_rate: round_to(100.0 - percent(time_misfit, feedback.len()), 1),
        sensitive_rate: percent(sensitive, interactions.len()),
        policy_compliance_rate: round_to(100.0 - percent(off_policy, interactions.len()), 1),
        top_topics: top_topics(interactions),
    }
}

/// Topic counts, most frequent first; ties keep first-seen order.
fn top_topics(interactions: &[InteractionRecord]) -> Vec<TopicCount> {
    let mut counts: Vec<TopicCount> = Vec::new();
    for topic in interactions.iter().flat_map(|i| i.topics.iter()) {
        match counts.iter_mut().find(|c| &c.topic == topic) {
            Some(entry) => entry.count += 1,
            None => counts.push(TopicCount {
                topic: topic.clone(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_TOPICS);
    counts
}
