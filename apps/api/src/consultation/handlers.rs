use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consultation::pipeline::{ConsultationOutcome, ConsultationRequest};
use crate::errors::AppError;
use crate::models::intake::{
    CoreValue, Emotion, Frequency, GradeBand, GroupSize, Setting, Specificity, Subject, TimeBudget,
    Urgency, ValueGroup, MAX_ATTEMPTS_CHARS, MAX_SELECTED_VALUES, UNSPECIFIED_LABEL,
};
use crate::models::records::DeficiencyReason;
use crate::safety::triage::{TriageForm, TRIAGE_QUESTIONS};
use crate::state::AppState;
use crate::submission_guard::SubmissionPermit;

// ────────────────────────────────────────────────────────────────────────────
// POST /api/v1/consultations
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/consultations
///
/// Runs the full pipeline. Only one submission per session may be in flight;
/// a concurrent second submission gets 409. The session is freed even when the
/// client disconnects mid-generation.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<ConsultationRequest>,
) -> Result<Json<ConsultationOutcome>, AppError> {
    let permit = match SubmissionPermit::acquire(state.guard.clone(), &request.session_id).await? {
        Some(permit) => permit,
        None => return Err(AppError::SubmissionInFlight),
    };

    let result = state.pipeline.run(request).await;
    permit.release().await;

    result.map(Json)
}

// ────────────────────────────────────────────────────────────────────────────
// POST /api/v1/consultations/assess
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub safety_checkbox: bool,
    #[serde(default)]
    pub triage: TriageForm,
}

#[derive(Debug, Serialize)]
pub struct TriageQuestion {
    pub key: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub needs_safety: bool,
    pub auto_detected: bool,
    /// True when no further triage answers are needed to submit.
    pub triage_complete: bool,
    pub missing: Vec<&'static str>,
    /// The triage questions to show, present only in safety mode.
    pub questions: Vec<TriageQuestion>,
}

/// POST /api/v1/consultations/assess
///
/// Lets the form show the triage questions before the teacher submits.
/// Never calls the model and never writes anything.
pub async fn handle_assess(
    State(state): State<AppState>,
    Json(request): Json<AssessRequest>,
) -> Json<AssessResponse> {
    let response = match state
        .pipeline
        .assess(request.safety_checkbox, &request.narrative, request.triage)
    {
        Ok(assessment) => AssessResponse {
            needs_safety: assessment.needs_safety,
            auto_detected: assessment.auto_detected,
            triage_complete: true,
            missing: Vec::new(),
            questions: if assessment.needs_safety {
                triage_questions()
            } else {
                Vec::new()
            },
        },
        Err(missing) => AssessResponse {
            needs_safety: true,
            auto_detected: missing.auto_detected,
            triage_complete: false,
            missing: missing.missing,
            questions: triage_questions(),
        },
    };
    Json(response)
}

fn triage_questions() -> Vec<TriageQuestion> {
    TRIAGE_QUESTIONS
        .iter()
        .map(|(key, text)| TriageQuestion { key, text })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// GET /api/v1/taxonomy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OptionItem {
    /// Wire identifier, as accepted in the intake.
    pub id: Value,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ValueGroupItem {
    pub id: Value,
    pub label: &'static str,
    pub values: Vec<OptionItem>,
}

#[derive(Debug, Serialize)]
pub struct TaxonomyResponse {
    pub grade: Vec<OptionItem>,
    pub scale: Vec<OptionItem>,
    pub scene: Vec<OptionItem>,
    pub frequency: Vec<OptionItem>,
    pub urgency: Vec<OptionItem>,
    pub emotion: Vec<OptionItem>,
    pub subject: Vec<OptionItem>,
    pub time_budget: Vec<OptionItem>,
    pub specificity: Vec<OptionItem>,
    pub value_groups: Vec<ValueGroupItem>,
    pub deficiency_reasons: Vec<OptionItem>,
    pub triage_questions: Vec<TriageQuestion>,
    pub unspecified_label: &'static str,
    pub max_selected_values: usize,
    pub max_attempts_chars: usize,
}

fn options<T: Serialize + Copy>(all: &[T], label: fn(T) -> &'static str) -> Vec<OptionItem> {
    all.iter()
        .map(|item| OptionItem {
            id: serde_json::to_value(item).unwrap_or(Value::Null),
            label: label(*item),
        })
        .collect()
}

pub fn taxonomy() -> TaxonomyResponse {
    let value_groups = ValueGroup::ALL
        .iter()
        .map(|group| {
            let members: Vec<CoreValue> = CoreValue::ALL
                .into_iter()
                .filter(|v| v.group() == *group)
                .collect();
            ValueGroupItem {
                id: serde_json::to_value(group).unwrap_or(Value::Null),
                label: group.label(),
                values: options(&members, CoreValue::label),
            }
        })
        .collect();

    TaxonomyResponse {
        grade: options(&GradeBand::ALL, GradeBand::label),
        scale: options(&GroupSize::ALL, GroupSize::label),
        scene: options(&Setting::ALL, Setting::label),
        frequency: options(&Frequency::ALL, Frequency::label),
        urgency: options(&Urgency::ALL, Urgency::label),
        emotion: options(&Emotion::ALL, Emotion::label),
        subject: options(&Subject::ALL, Subject::label),
        time_budget: options(&TimeBudget::ALL, TimeBudget::label),
        specificity: options(&Specificity::ALL, Specificity::label),
        value_groups,
        deficiency_reasons: options(&DeficiencyReason::ALL, DeficiencyReason::label),
        triage_questions: triage_questions(),
        unspecified_label: UNSPECIFIED_LABEL,
        max_selected_values: MAX_SELECTED_VALUES,
        max_attempts_chars: MAX_ATTEMPTS_CHARS,
    }
}

/// GET /api/v1/taxonomy
///
/// The closed option lists with their display labels, for building the form.
pub async fn handle_taxonomy() -> Json<TaxonomyResponse> {
    Json(taxonomy())
}
