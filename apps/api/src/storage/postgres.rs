//! PostgreSQL backend. Schema lives in `migrations/`.
//!
//! Enumerations are stored as their snake_case text and parsed back on read;
//! an unknown value surfaces as `StoreError::Corrupt` rather than a silent default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::intake::Intake;
use crate::models::policy::{Phrasebook, Policy};
use crate::models::records::{
    ComplianceStatus, DeficiencyReason, FeedbackEntry, FeedbackRecord, InteractionRecord, Rating,
};
use crate::safety::triage::TriageAnswers;
use crate::storage::{InteractionStore, PolicyStore, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `edit` against the organization's policy inside one transaction,
    /// seeding the default first if the organization has none yet.
    async fn edit_policy<F>(&self, org_id: Uuid, edit: F) -> Result<Policy, StoreError>
    where
        F: FnOnce(&mut Policy) + Send,
    {
        let mut tx = self.pool.begin().await?;

        seed_default(&mut tx, org_id).await?;

        let Json(mut policy) = sqlx::query_scalar::<_, Json<Policy>>(
            "SELECT policy FROM org_policies WHERE org_id = $1 FOR UPDATE",
        )
        .bind(org_id)
        .fetch_one(&mut *tx)
        .await?;

        edit(&mut policy);

        sqlx::query("UPDATE org_policies SET policy = $2, updated_at = now() WHERE org_id = $1")
            .bind(org_id)
            .bind(Json(&policy))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(policy)
    }
}

async fn seed_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    org_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO org_policies (org_id, policy) VALUES ($1, $2) ON CONFLICT (org_id) DO NOTHING",
    )
    .bind(org_id)
    .bind(Json(Policy::default()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct InteractionRow {
    id: Uuid,
    org_id: Uuid,
    user_id: Uuid,
    session_id: String,
    intake: Json<Intake>,
    topics: Vec<String>,
    sensitive_flag: bool,
    auto_detected: bool,
    triage: Option<Json<TriageAnswers>>,
    model: String,
    final_text: String,
    compliance: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InteractionRow> for InteractionRecord {
    type Error = StoreError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let compliance = ComplianceStatus::parse(&row.compliance).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "interaction {} has compliance '{}'",
                row.id, row.compliance
            ))
        })?;
        Ok(InteractionRecord {
            id: row.id,
            org_id: row.org_id,
            user_id: row.user_id,
            session_id: row.session_id,
            intake: row.intake.0,
            topics: row.topics,
            sensitive_flag: row.sensitive_flag,
            auto_detected: row.auto_detected,
            triage: row.triage.map(|t| t.0),
            model: row.model,
            final_text: row.final_text,
            compliance,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: Uuid,
    interaction_id: Uuid,
    org_id: Uuid,
    user_id: Uuid,
    rating: String,
    reasons: Json<Vec<DeficiencyReason>>,
    note: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let rating = Rating::parse(&row.rating).ok_or_else(|| {
            StoreError::Corrupt(format!("feedback {} has rating '{}'", row.id, row.rating))
        })?;
        Ok(FeedbackRecord {
            id: row.id,
            interaction_id: row.interaction_id,
            org_id: row.org_id,
            user_id: row.user_id,
            rating,
            reasons: row.reasons.0,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct FeedbackHistoryRow {
    #[sqlx(flatten)]
    feedback: FeedbackRow,
    intake: Option<Json<Intake>>,
}

const INTERACTION_COLUMNS: &str = "id, org_id, user_id, session_id, intake, topics, \
     sensitive_flag, auto_detected, triage, model, final_text, compliance, created_at";

const FEEDBACK_COLUMNS: &str =
    "id, interaction_id, org_id, user_id, rating, reasons, note, created_at";

// ────────────────────────────────────────────────────────────────────────────
// Store implementations
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl InteractionStore for PgStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO interactions
                (id, org_id, user_id, session_id, intake, topics, sensitive_flag,
                 auto_detected, triage, model, final_text, compliance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(record.org_id)
        .bind(record.user_id)
        .bind(&record.session_id)
        .bind(Json(&record.intake))
        .bind(&record.topics)
        .bind(record.sensitive_flag)
        .bind(record.auto_detected)
        .bind(record.triage.as_ref().map(Json))
        .bind(&record.model)
        .bind(&record.final_text)
        .bind(record.compliance.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_interaction(&self, id: Uuid) -> Result<Option<InteractionRecord>, StoreError> {
        sqlx::query_as::<_, InteractionRow>(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(InteractionRecord::try_from)
        .transpose()
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feedbacks
                (id, interaction_id, org_id, user_id, rating, reasons, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.interaction_id)
        .bind(record.org_id)
        .bind(record.user_id)
        .bind(record.rating.as_str())
        .bind(Json(&record.reasons))
        .bind(&record.note)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn feedback_history(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError> {
        let rows = sqlx::query_as::<_, FeedbackHistoryRow>(&format!(
            r#"
            SELECT f.*, i.intake
            FROM (
                SELECT {FEEDBACK_COLUMNS} FROM feedbacks
                WHERE org_id = $1 AND user_id = $2
                ORDER BY created_at DESC
                LIMIT $3
            ) f
            LEFT JOIN interactions i ON i.id = f.interaction_id
            ORDER BY f.created_at ASC
            "#
        ))
        .bind(org_id)
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<FeedbackEntry, StoreError> {
                Ok(FeedbackEntry {
                    feedback: FeedbackRecord::try_from(row.feedback)?,
                    intake: row.intake.map(|i| i.0),
                })
            })
            .collect()
    }

    async fn interactions_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        sqlx::query_as::<_, InteractionRow>(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions \
             WHERE org_id = $1 AND created_at >= $2 ORDER BY created_at"
        ))
        .bind(org_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(InteractionRecord::try_from)
        .collect()
    }

    async fn feedback_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackRecord>, StoreError> {
        sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedbacks \
             WHERE org_id = $1 AND created_at >= $2 ORDER BY created_at"
        ))
        .bind(org_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(FeedbackRecord::try_from)
        .collect()
    }
}

#[async_trait]
impl PolicyStore for PgStore {
    async fn load_or_init(&self, org_id: Uuid) -> Result<Policy, StoreError> {
        let mut tx = self.pool.begin().await?;
        seed_default(&mut tx, org_id).await?;
        let Json(policy) = sqlx::query_scalar::<_, Json<Policy>>(
            "SELECT policy FROM org_policies WHERE org_id = $1",
        )
        .bind(org_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(policy)
    }

    async fn update_phrasebook(
        &self,
        org_id: Uuid,
        phrasebook: Phrasebook,
    ) -> Result<Policy, StoreError> {
        self.edit_policy(org_id, |policy| policy.phrasebook = phrasebook)
            .await
    }

    async fn replace_avoid_phrases(
        &self,
        org_id: Uuid,
        avoid_phrases: Vec<String>,
    ) -> Result<Policy, StoreError> {
        self.edit_policy(org_id, |policy| policy.avoid_phrases = avoid_phrases)
            .await
    }
}
