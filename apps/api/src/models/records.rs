use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::intake::Intake;
use crate::safety::triage::TriageAnswers;

/// How the delivered text relates to the forbidden-phrase check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Safety mode was off; the text was not checked.
    NotRequired,
    /// Safety mode was on and the first draft complied.
    Passed,
    /// The first draft violated policy; the corrective draft was delivered.
    Corrected,
    /// The corrective draft still matched a forbidden phrase. Delivered as-is.
    CorrectedWithResidualViolation,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::NotRequired => "not_required",
            ComplianceStatus::Passed => "passed",
            ComplianceStatus::Corrected => "corrected",
            ComplianceStatus::CorrectedWithResidualViolation => {
                "corrected_with_residual_violation"
            }
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_required" => Some(ComplianceStatus::NotRequired),
            "passed" => Some(ComplianceStatus::Passed),
            "corrected" => Some(ComplianceStatus::Corrected),
            "corrected_with_residual_violation" => {
                Some(ComplianceStatus::CorrectedWithResidualViolation)
            }
            _ => None,
        }
    }

    pub fn regenerated(self) -> bool {
        matches!(
            self,
            ComplianceStatus::Corrected | ComplianceStatus::CorrectedWithResidualViolation
        )
    }
}

/// One submitted consultation and the advice delivered for it. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub intake: Intake,
    pub topics: Vec<String>,
    pub sensitive_flag: bool,
    pub auto_detected: bool,
    pub triage: Option<TriageAnswers>,
    pub model: String,
    pub final_text: String,
    pub compliance: ComplianceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Good,
    Ok,
    Bad,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::Ok => "ok",
            Rating::Bad => "bad",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(Rating::Good),
            "ok" => Some(Rating::Ok),
            "bad" => Some(Rating::Bad),
            _ => None,
        }
    }
}

/// Closed list of reasons a teacher can give for advice that missed the mark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencyReason {
    TooAbstract,
    PoorGradeFit,
    DoesNotFitTime,
    UnclearMaterials,
    WeakPhrasing,
    InsufficientSafety,
    InsufficientParentGuidance,
    WeakEvidence,
}

impl DeficiencyReason {
    pub const ALL: [DeficiencyReason; 8] = [
        DeficiencyReason::TooAbstract,
        DeficiencyReason::PoorGradeFit,
        DeficiencyReason::DoesNotFitTime,
        DeficiencyReason::UnclearMaterials,
        DeficiencyReason::WeakPhrasing,
        DeficiencyReason::InsufficientSafety,
        DeficiencyReason::InsufficientParentGuidance,
        DeficiencyReason::WeakEvidence,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DeficiencyReason::TooAbstract => "抽象的すぎる",
            DeficiencyReason::PoorGradeFit => "学年フィット不足",
            DeficiencyReason::DoesNotFitTime => "時間に合わない",
            DeficiencyReason::UnclearMaterials => "準備物が不明",
            DeficiencyReason::WeakPhrasing => "声かけが弱い",
            DeficiencyReason::InsufficientSafety => "安全面が不十分",
            DeficiencyReason::InsufficientParentGuidance => "保護者対応が不足",
            DeficiencyReason::WeakEvidence => "根拠が薄い",
        }
    }
}

/// A teacher's rating of one delivered answer. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub interaction_id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub rating: Rating,
    pub reasons: Vec<DeficiencyReason>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Feedback joined with the intake it rated. `intake` is `None` when the
/// linked interaction could not be found.
#[derive(Debug, Clone)]
pub struct FeedbackEntry {
    pub feedback: FeedbackRecord,
    pub intake: Option<Intake>,
}
