use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::policy::{Phrasebook, Policy};
use crate::models::records::{FeedbackEntry, FeedbackRecord, InteractionRecord};
use crate::storage::{join_feedback_history, InteractionStore, PolicyStore, StoreError};

/// Process-local store for development. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    interactions: RwLock<Vec<InteractionRecord>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
    policies: RwLock<HashMap<Uuid, Policy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError> {
        self.interactions.write().await.push(record.clone());
        Ok(())
    }

    async fn get_interaction(&self, id: Uuid) -> Result<Option<InteractionRecord>, StoreError> {
        Ok(self
            .interactions
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        self.feedback.write().await.push(record.clone());
        Ok(())
    }

    async fn feedback_history(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError> {
        let feedback = self.feedback.read().await;
        let interactions = self.interactions.read().await;
        Ok(join_feedback_history(
            &feedback,
            &interactions,
            org_id,
            user_id,
            limit,
        ))
    }

    async fn interactions_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        Ok(self
            .interactions
            .read()
            .await
            .iter()
            .filter(|r| r.org_id == org_id && r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn feedback_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackRecord>, StoreError> {
        Ok(self
            .feedback
            .read()
            .await
            .iter()
            .filter(|r| r.org_id == org_id && r.created_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn load_or_init(&self, org_id: Uuid) -> Result<Policy, StoreError> {
        let mut policies = self.policies.write().await;
        Ok(policies.entry(org_id).or_default().clone())
    }

    async fn update_phrasebook(
        &self,
        org_id: Uuid,
        phrasebook: Phrasebook,
    ) -> Result<Policy, StoreError> {
        let mut policies = self.policies.write().await;
        let policy = policies.entry(org_id).or_default();
        policy.phrasebook = phrasebook;
        Ok(policy.clone())
    }

    async fn replace_avoid_phrases(
        &self,
        org_id: Uuid,
        avoid_phrases: Vec<String>,
    ) -> Result<Policy, StoreError> {
        let mut policies = self.policies.write().await;
        let policy = policies.entry(org_id).or_default();
        policy.avoid_phrases = avoid_phrases;
        Ok(policy.clone())
    }
}
