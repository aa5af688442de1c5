//! Persistence — append-only interaction and feedback logs plus per-organization policy.
//!
//! Backends are swapped at startup via `STORAGE_BACKEND`; callers only see the traits.
//! CRITICAL: interaction and feedback records are never updated or deleted.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::intake::Intake;
use crate::models::policy::{Phrasebook, Policy};
use crate::models::records::{FeedbackEntry, FeedbackRecord, InteractionRecord};

pub mod json_file;
pub mod memory;
pub mod postgres;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError>;

    async fn get_interaction(&self, id: Uuid) -> Result<Option<InteractionRecord>, StoreError>;

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError>;

    /// The user's most recent `limit` feedback entries, oldest first, each joined
    /// with the intake it rated.
    async fn feedback_history(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError>;

    async fn interactions_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionRecord>, StoreError>;

    async fn feedback_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackRecord>, StoreError>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Returns the organization's policy, seeding the default on first use.
    async fn load_or_init(&self, org_id: Uuid) -> Result<Policy, StoreError>;

    async fn update_phrasebook(
        &self,
        org_id: Uuid,
        phrasebook: Phrasebook,
    ) -> Result<Policy, StoreError>;

    async fn replace_avoid_phrases(
        &self,
        org_id: Uuid,
        avoid_phrases: Vec<String>,
    ) -> Result<Policy, StoreError>;
}

/// Shared join for backends that hold whole logs in memory: filters the user's
/// feedback, keeps the latest `limit`, and attaches each linked intake.
pub(crate) fn join_feedback_history(
    feedback: &[FeedbackRecord],
    interactions: &[InteractionRecord],
    org_id: Uuid,
    user_id: Uuid,
    limit: usize,
) -> Vec<FeedbackEntry> {
    let intakes: HashMap<Uuid, &Intake> = interactions
        .iter()
        .map(|record| (record.id, &record.intake))
        .collect();

    let mut mine: Vec<&FeedbackRecord> = feedback
        .iter()
        .filter(|f| f.org_id == org_id && f.user_id == user_id)
        .collect();
    mine.sort_by_key(|f| f.created_at);
    let skip = mine.len().saturating_sub(limit);

    mine.into_iter()
        .skip(skip)
        .map(|f| FeedbackEntry {
            feedback: f.clone(),
            intake: intakes.get(&f.interaction_id).map(|i| (*i).clone()),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::models::intake::tests::complete_form;
    use crate::models::records::{
        ComplianceStatus, DeficiencyReason, FeedbackRecord, InteractionRecord, Rating,
    };

    pub fn interaction(org_id: Uuid, user_id: Uuid, minutes_ago: i64) -> InteractionRecord {
        InteractionRecord {
            id: Uuid::new_v4(),
            org_id,
            user_id,
            session_id: "session-1".to_string(),
            intake: complete_form().validate().unwrap(),
            topics: vec!["関係性".to_string()],
            sensitive_flag: false,
            auto_detected: false,
            triage: None,
            model: "scripted".to_string(),
            final_text: "0) 先生へのひと言".to_string(),
            compliance: ComplianceStatus::NotRequired,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    pub fn feedback(record: &InteractionRecord, rating: Rating, minutes_ago: i64) -> FeedbackRecord {
        FeedbackRecord {
            id: Uuid::new_v4(),
            interaction_id: record.id,
            org_id: record.org_id,
            user_id: record.user_id,
            rating,
            reasons: if rating == Rating::Bad {
                vec![DeficiencyReason::TooAbstract]
            } else {
                vec![]
            },
            note: String::new(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }
}
