//! Prompt Assembler — deterministic composition of the generation request.
//!
//! Section order is fixed: example + mission, policy, personalization (optional),
//! safety (only in safety mode), intake, theory catalogue, output contract,
//! closing rules, then the high-specificity constraint when requested.
//!
//! Input is assumed validated; the assembler never fills in missing fields.

use crate::consultation::prompts::{
    CLOSING_RULES_TEMPLATE, CORRECTIVE_INSTRUCTION, FEW_SHOT_EXAMPLE,
    HIGH_SPECIFICITY_CONSTRAINT, INTAKE_TEMPLATE, MISSION, NO_ATTEMPTS, NO_VALUES,
    NO_VALUE_TAGS, OUTPUT_CONTRACT, PERSONALIZATION_TEMPLATE, POLICY_TEMPLATE,
    SAFETY_TEMPLATE, THEORY_CATALOG,
};
use crate::llm_client::GenerationRequest;
use crate::models::intake::{Intake, Specificity};
use crate::models::policy::Policy;
use crate::safety::triage::{SafetyAssessment, TriageAnswers};

pub const TEMPERATURE: f32 = 0.45;
pub const CORRECTIVE_TEMPERATURE: f32 = 0.4;
pub const MAX_OUTPUT_TOKENS: u32 = 1200;

/// Builds the first generation request for a submission.
pub fn build_prompt(
    intake: &Intake,
    policy: &Policy,
    hints: &str,
    assessment: &SafetyAssessment,
) -> GenerationRequest {
    let mut sections: Vec<String> = vec![
        FEW_SHOT_EXAMPLE.to_string(),
        MISSION.to_string(),
        policy_block(policy),
    ];

    if !hints.trim().is_empty() {
        sections.push(PERSONALIZATION_TEMPLATE.replace("{hints}", hints.trim()));
    }

    if assessment.needs_safety {
        sections.push(safety_block(assessment.triage.as_ref()));
    }

    sections.push(intake_block(intake, policy));
    sections.push(THEORY_CATALOG.to_string());
    sections.push(OUTPUT_CONTRACT.to_string());
    sections.push(CLOSING_RULES_TEMPLATE.replace("{time_budget}", intake.time_budget_label()));

    if intake.specificity == Specificity::High {
        sections.push(HIGH_SPECIFICITY_CONSTRAINT.to_string());
    }

    GenerationRequest::new(sections.join("\n\n"), TEMPERATURE, MAX_OUTPUT_TOKENS)
}

/// Derives the corrective request: the first prompt plus the fixed corrective instruction.
pub fn build_corrective(first: &GenerationRequest) -> GenerationRequest {
    first.with_appended(CORRECTIVE_INSTRUCTION, CORRECTIVE_TEMPERATURE)
}

fn policy_block(policy: &Policy) -> String {
    POLICY_TEMPLATE
        .replace("{must_include}", &policy.must_include.join("・"))
        .replace("{avoid_phrases}", &policy.avoid_phrases.join("・"))
        .replace("{teacher_open}", &policy.phrasebook.teacher_open)
        .replace("{parent_open}", &policy.phrasebook.parent_open)
        .replace("{ask_help}", &policy.phrasebook.ask_help)
        .replace("{tone_teacher}", &policy.tone.teacher)
        .replace("{tone_parent}", &policy.tone.parent)
        .replace("{tone_student_low}", &policy.tone.student_low)
        .replace("{tone_student_high}", &policy.tone.student_high)
}

fn safety_block(triage: Option<&TriageAnswers>) -> String {
    let (q1, q2, q3) = match triage {
        Some(t) => (t.q1.label(), t.q2.label(), t.q3.label()),
        None => ("不明", "不明", "不明"),
    };
    SAFETY_TEMPLATE
        .replace("{q1}", q1)
        .replace("{q2}", q2)
        .replace("{q3}", q3)
}

fn intake_block(intake: &Intake, policy: &Policy) -> String {
    let values = if intake.values.is_empty() {
        NO_VALUES.to_string()
    } else {
        intake
            .values
            .iter()
            .map(|v| format!("- {}", v.label()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tags = policy.theory_tags(&intake.values);
    let value_tags = if tags.is_empty() {
        NO_VALUE_TAGS.to_string()
    } else {
        tags.join("｜")
    };

    let attempts = if intake.attempts.is_empty() {
        NO_ATTEMPTS
    } else {
        intake.attempts.as_str()
    };

    let template = INTAKE_TEMPLATE
        .replace("{values}", &values)
        .replace("{value_tags}", &value_tags)
        .replace("{grade}", intake.grade.label())
        .replace("{subject}", intake.subject_label())
        .replace("{scale}", intake.scale.label())
        .replace("{scene}", intake.scene.label())
        .replace("{frequency}", intake.frequency.label())
        .replace("{urgency}", intake.urgency.label())
        .replace("{emotion}", intake.emotion.label())
        .replace("{time_budget}", intake.time_budget_label());

    // Free text is spliced in one pass so placeholders typed by the teacher are left alone.
    fill_free_text(
        &template,
        &[("{attempts}", attempts), ("{narrative}", intake.narrative.as_str())],
    )
}

/// Replaces each placeholder with its value in a single left-to-right scan.
/// Inserted values are never scanned again.
fn fill_free_text(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = fields
            .iter()
            .filter_map(|&(key, value)| rest.find(key).map(|at| (at, key, value)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, key, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
