//! Safety-Guard Pipeline — runs one consultation submission end to end.
//!
//! Flow: validate intake → assess safety → load policy → personalization hints →
//!       assemble → generate → (safety mode) compliance check with at most one
//!       corrective regeneration → classify topics → append interaction.
//!
//! CRITICAL: a submission makes at most two model calls. A generation failure
//! persists nothing; a persistence failure does not discard the generated text.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::consultation::assembler::{build_corrective, build_prompt};
use crate::consultation::topics::TopicClassifier;
use crate::errors::AppError;
use crate::feedback::personalization::build_hints;
use crate::llm_client::{
    Attempt, GenerationClient, GenerationError, GenerationRequest, GenerationResult,
};
use crate::models::intake::IntakeForm;
use crate::models::policy::Policy;
use crate::models::records::{ComplianceStatus, InteractionRecord};
use crate::safety::compliance::ComplianceChecker;
use crate::safety::triage::{self, SafetyAssessment, TriageFallback, TriageForm, TriageMissing};
use crate::safety::SafetyRules;
use crate::storage::{InteractionStore, PolicyStore};

/// Feedback entries considered when building personalization hints.
pub const HINT_HISTORY_LIMIT: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for a consultation submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationRequest {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub intake: IntakeForm,
    /// The teacher ticked "this involves bullying or safety".
    #[serde(default)]
    pub safety_checkbox: bool,
    #[serde(default)]
    pub triage: TriageForm,
}

/// What the teacher gets back for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationOutcome {
    pub interaction_id: Uuid,
    pub text: String,
    pub attempt: Attempt,
    pub compliance: ComplianceStatus,
    pub regenerated: bool,
    pub needs_safety: bool,
    pub auto_detected: bool,
    pub topics: Vec<String>,
    /// False when the interaction log append failed. The text is still delivered.
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Regeneration control
// ────────────────────────────────────────────────────────────────────────────

/// True when `text` matches a forbidden pattern or contains one of the
/// organization's avoid phrases verbatim.
fn off_policy(compliance: &ComplianceChecker, policy: &Policy, text: &str) -> bool {
    compliance.violates_policy(text) || policy.contains_avoid_phrase(text)
}

/// Generates once and, in safety mode only, regenerates once if the first draft
/// is off policy. The corrective draft is checked again for reporting only.
pub async fn generate_with_correction(
    llm: &dyn GenerationClient,
    compliance: &ComplianceChecker,
    policy: &Policy,
    first: &GenerationRequest,
    needs_safety: bool,
) -> Result<(GenerationResult, ComplianceStatus), GenerationError> {
    let text = llm.complete(first).await?;

    if !needs_safety {
        let result = GenerationResult {
            text,
            attempt: Attempt::First,
        };
        return Ok((result, ComplianceStatus::NotRequired));
    }

    if !off_policy(compliance, policy, &text) {
        let result = GenerationResult {
            text,
            attempt: Attempt::First,
        };
        return Ok((result, ComplianceStatus::Passed));
    }

    warn!(
        matched = compliance.violations(&text).len(),
        avoid_phrase = policy.contains_avoid_phrase(&text),
        "First draft is off policy; running corrective pass"
    );
    let corrective = build_corrective(first);
    let text = llm.complete(&corrective).await?;

    let status = if off_policy(compliance, policy, &text) {
        warn!(
            matched = compliance.violations(&text).len(),
            avoid_phrase = policy.contains_avoid_phrase(&text),
            "Corrective draft is still off policy; delivering flagged"
        );
        ComplianceStatus::CorrectedWithResidualViolation
    } else {
        ComplianceStatus::Corrected
    };

    let result = GenerationResult {
        text,
        attempt: Attempt::Corrective,
    };
    Ok((result, status))
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ConsultationPipeline {
    llm: Arc<dyn GenerationClient>,
    interactions: Arc<dyn InteractionStore>,
    policies: Arc<dyn PolicyStore>,
    rules: SafetyRules,
    topics: TopicClassifier,
    triage_fallback: TriageFallback,
}

impl ConsultationPipeline {
    pub fn new(
        llm: Arc<dyn GenerationClient>,
        interactions: Arc<dyn InteractionStore>,
        policies: Arc<dyn PolicyStore>,
        rules: SafetyRules,
        topics: TopicClassifier,
        triage_fallback: TriageFallback,
    ) -> Self {
        Self {
            llm,
            interactions,
            policies,
            rules,
            topics,
            triage_fallback,
        }
    }

    /// Safety assessment for a narrative, using the configured triage fallback.
    pub fn assess(
        &self,
        checkbox: bool,
        narrative: &str,
        triage_form: TriageForm,
    ) -> Result<SafetyAssessment, TriageMissing> {
        triage::assess(
            &self.rules.sensitivity,
            checkbox,
            narrative,
            triage_form,
            self.triage_fallback,
        )
    }

    /// Runs one submission.
    ///
    /// Steps:
    /// 1. validate intake (no model call on failure)
    /// 2. assess safety; triage answers must be complete per the fallback policy
    /// 3. load the organization policy (seeded on first use)
    /// 4. personalization hints from the teacher's feedback (best effort)
    /// 5. assemble and generate, with the bounded corrective pass
    /// 6. classify topics
    /// 7. append the interaction record (failure reported, not fatal)
    pub async fn run(&self, request: ConsultationRequest) -> Result<ConsultationOutcome, AppError> {
        // Step 1: Validate
        if request.session_id.trim().is_empty() {
            return Err(AppError::Validation("session_id must not be empty".to_string()));
        }
        let intake = request.intake.validate()?;

        // Step 2: Safety assessment
        let assessment = self.assess(request.safety_checkbox, &intake.narrative, request.triage)?;
        info!(
            org_id = %request.org_id,
            needs_safety = assessment.needs_safety,
            auto_detected = assessment.auto_detected,
            "Consultation assessed"
        );

        // Step 3: Policy
        let policy = self.policies.load_or_init(request.org_id).await?;

        // Step 4: Personalization
        let hints = match self
            .interactions
            .feedback_history(request.org_id, request.user_id, HINT_HISTORY_LIMIT)
            .await
        {
            Ok(history) => build_hints(&history),
            Err(e) => {
                warn!("Feedback history unavailable, continuing without hints: {e}");
                String::new()
            }
        };

        // Step 5: Assemble + generate
        let first = build_prompt(&intake, &policy, &hints, &assessment);
        let (result, compliance) = generate_with_correction(
            self.llm.as_ref(),
            &self.rules.compliance,
            &policy,
            &first,
            assessment.needs_safety,
        )
        .await?;

        // Step 6: Topics
        let topics = self.topics.classify(&intake.narrative);

        // Step 7: Persist
        let record = InteractionRecord {
            id: Uuid::new_v4(),
            org_id: request.org_id,
            user_id: request.user_id,
            session_id: request.session_id,
            intake,
            topics,
            sensitive_flag: assessment.needs_safety,
            auto_detected: assessment.auto_detected,
            triage: assessment.triage,
            model: self.llm.model().to_string(),
            final_text: result.text,
            compliance,
            created_at: Utc::now(),
        };

        let persistence_error = match self.interactions.append_interaction(&record).await {
            Ok(()) => None,
            Err(e) => {
                warn!(interaction_id = %record.id, "Failed to persist interaction: {e}");
                Some(e.to_string())
            }
        };

        info!(
            interaction_id = %record.id,
            compliance = compliance.as_str(),
            chars = record.final_text.chars().count(),
            "Consultation complete"
        );

        Ok(ConsultationOutcome {
            interaction_id: record.id,
            text: record.final_text,
            attempt: result.attempt,
            compliance,
            regenerated: compliance.regenerated(),
            needs_safety: assessment.needs_safety,
            auto_detected: assessment.auto_detected,
            topics: record.topics,
            persisted: persistence_error.is_none(),
            persistence_error,
        })
    }
}
