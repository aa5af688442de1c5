use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::records::{DeficiencyReason, FeedbackRecord, Rating};
use crate::state::AppState;
use crate::storage::InteractionStore;

/// Upper bound on the free-text note, in characters.
pub const MAX_NOTE_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub interaction_id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub rating: Rating,
    #[serde(default)]
    pub reasons: Vec<DeficiencyReason>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Appends one feedback record after checking that the rated interaction
/// exists within the caller's organization and was the caller's own.
/// Feedback shapes the rater's personalization hints, so teachers cannot
/// rate each other's consultations.
pub async fn record_feedback(
    store: &dyn InteractionStore,
    request: FeedbackRequest,
) -> Result<FeedbackRecord, AppError> {
    let note = request.note.trim().to_string();
    let note_len = note.chars().count();
    if note_len > MAX_NOTE_CHARS {
        return Err(AppError::Validation(format!(
            "note is {note_len} characters (max {MAX_NOTE_CHARS})"
        )));
    }

    let interaction = store
        .get_interaction(request.interaction_id)
        .await?
        .filter(|i| i.org_id == request.org_id && i.user_id == request.user_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("Interaction {} not found", request.interaction_id))
        })?;

    let mut reasons: Vec<DeficiencyReason> = Vec::with_capacity(request.reasons.len());
    for reason in request.reasons {
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }

    let record = FeedbackRecord {
        id: Uuid::new_v4(),
        interaction_id: interaction.id,
        org_id: request.org_id,
        user_id: request.user_id,
        rating: request.rating,
        reasons,
        note,
        created_at: Utc::now(),
    };
    store.append_feedback(&record).await?;

    info!(
        feedback_id = %record.id,
        interaction_id = %record.interaction_id,
        rating = record.rating.as_str(),
        "Feedback recorded"
    );
    Ok(record)
}

/// POST /api/v1/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), AppError> {
    let record = record_feedback(state.interactions.as_ref(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            feedback_id: record.id,
            created_at: record.created_at,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::InteractionRecord;
    use crate::storage::fixtures::interaction;
    use crate::storage::MemoryStore;

    fn request_for(rated: &InteractionRecord) -> FeedbackRequest {
        FeedbackRequest {
            interaction_id: rated.id,
            org_id: rated.org_id,
            user_id: rated.user_id,
            rating: Rating::Bad,
            reasons: vec![
                DeficiencyReason::TooAbstract,
                DeficiencyReason::DoesNotFitTime,
                DeficiencyReason::TooAbstract,
            ],
            note: "  もう少し具体的に  ".to_string(),
        }
    }

    #[tokio::test]
    async fn test_feedback_is_appended_with_deduplicated_reasons() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let rated = interaction(org, Uuid::new_v4(), 5);
        store.append_interaction(&rated).await.unwrap();

        let record = record_feedback(&store, request_for(&rated))
            .await
            .unwrap();

        assert_eq!(
            record.reasons,
            vec![DeficiencyReason::TooAbstract, DeficiencyReason::DoesNotFitTime]
        );
        assert_eq!(record.note, "もう少し具体的に");
        let stored = store
            .feedback_since(org, DateTime::<Utc>::MIN_UTC)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
    }

    #[tokio::test]
    async fn test_unknown_interaction_is_not_found() {
        let store = MemoryStore::new();
        let unsaved = interaction(Uuid::new_v4(), Uuid::new_v4(), 5);
        let err = record_feedback(&store, request_for(&unsaved))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_other_organizations_interaction_is_not_found() {
        let store = MemoryStore::new();
        let rated = interaction(Uuid::new_v4(), Uuid::new_v4(), 5);
        store.append_interaction(&rated).await.unwrap();

        let mut request = request_for(&rated);
        request.org_id = Uuid::new_v4();
        let err = record_feedback(&store, request).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_other_teachers_interaction_is_not_found() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let rated = interaction(org, Uuid::new_v4(), 5);
        store.append_interaction(&rated).await.unwrap();

        let mut request = request_for(&rated);
        request.user_id = Uuid::new_v4();
        let err = record_feedback(&store, request).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let history = store
            .feedback_history(org, rated.user_id, 50)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_note_is_rejected() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let rated = interaction(org, Uuid::new_v4(), 5);
        store.append_interaction(&rated).await.unwrap();
        let mut request = request_for(&rated);
        request.note = "あ".repeat(MAX_NOTE_CHARS + 1);

        let err = record_feedback(&store, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
