use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::policy::{Phrasebook, Policy};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PolicyQuery {
    pub org_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PhrasebookUpdate {
    pub org_id: Uuid,
    pub phrasebook: Phrasebook,
}

#[derive(Debug, Deserialize)]
pub struct AvoidPhrasesUpdate {
    pub org_id: Uuid,
    pub avoid_phrases: Vec<String>,
}

/// GET /api/v1/policy?org_id=
///
/// The organization's policy. The default is stored on first read.
pub async fn handle_get_policy(
    State(state): State<AppState>,
    Query(query): Query<PolicyQuery>,
) -> Result<Json<Policy>, AppError> {
    Ok(Json(state.policies.load_or_init(query.org_id).await?))
}

/// PATCH /api/v1/policy/phrasebook
pub async fn handle_update_phrasebook(
    State(state): State<AppState>,
    Json(update): Json<PhrasebookUpdate>,
) -> Result<Json<Policy>, AppError> {
    let phrasebook = Phrasebook {
        teacher_open: update.phrasebook.teacher_open.trim().to_string(),
        parent_open: update.phrasebook.parent_open.trim().to_string(),
        ask_help: update.phrasebook.ask_help.trim().to_string(),
    };
    let policy = state
        .policies
        .update_phrasebook(update.org_id, phrasebook)
        .await?;
    info!(org_id = %update.org_id, "Phrasebook updated");
    Ok(Json(policy))
}

/// PATCH /api/v1/policy/avoid-phrases
///
/// Replaces the whole list. Blank entries and duplicates are dropped.
pub async fn handle_replace_avoid_phrases(
    State(state): State<AppState>,
    Json(update): Json<AvoidPhrasesUpdate>,
) -> Result<Json<Policy>, AppError> {
    let phrases = normalize_phrases(update.avoid_phrases);
    let policy = state
        .policies
        .replace_avoid_phrases(update.org_id, phrases)
        .await?;
    info!(
        org_id = %update.org_id,
        count = policy.avoid_phrases.len(),
        "Avoid phrases replaced"
    );
    Ok(Json(policy))
}

fn normalize_phrases(raw: Vec<String>) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::with_capacity(raw.len());
    for phrase in raw {
        let phrase = phrase.trim();
        if !phrase.is_empty() && !phrases.iter().any(|p| p == phrase) {
            phrases.push(phrase.to_string());
        }
    }
    phrases
}
