//! JSON-lines backend for single-node deployments.
//!
//! Layout under the data directory:
//! - `interactions.jsonl`: one `InteractionRecord` per line, append-only
//! - `feedback.jsonl`: one `FeedbackRecord` per line, append-only
//! - `policies.json`: map of organization id to policy, rewritten atomically
//!
//! CRITICAL: all writes go through `write_lock` so concurrent appends never interleave.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::models::policy::{Phrasebook, Policy};
use crate::models::records::{FeedbackEntry, FeedbackRecord, InteractionRecord};
use crate::storage::{join_feedback_history, InteractionStore, PolicyStore, StoreError};

const INTERACTIONS_FILE: &str = "interactions.jsonl";
const FEEDBACK_FILE: &str = "feedback.jsonl";
const POLICIES_FILE: &str = "policies.json";

pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (creating if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn append_line<T: Serialize>(&self, file: &str, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(file))
            .await?;
        handle.write_all(&line).await?;
        handle.flush().await?;
        Ok(())
    }

    async fn read_policies(&self) -> Result<BTreeMap<Uuid, Policy>, StoreError> {
        match fs::read(self.path(POLICIES_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_policies(&self, policies: &BTreeMap<Uuid, Policy>) -> Result<(), StoreError> {
        let tmp = self.path(&format!("{POLICIES_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(policies)?).await?;
        fs::rename(&tmp, self.path(POLICIES_FILE)).await?;
        Ok(())
    }

    /// Read-modify-write of one organization's policy under the write lock.
    async fn edit_policy<F>(&self, org_id: Uuid, edit: F) -> Result<Policy, StoreError>
    where
        F: FnOnce(&mut Policy) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut policies = self.read_policies().await?;
        let policy = policies.entry(org_id).or_default();
        edit(policy);
        let updated = policy.clone();
        self.write_policies(&policies).await?;
        Ok(updated)
    }
}

/// Reads every parseable line. A missing file reads as empty; malformed lines
/// are skipped with a warning so one bad write cannot hide the rest of the log.
async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), line = n + 1, error = %e, "Skipping malformed log line"),
        }
    }
    Ok(records)
}

#[async_trait]
impl InteractionStore for JsonFileStore {
    async fn append_interaction(&self, record: &InteractionRecord) -> Result<(), StoreError> {
        self.append_line(INTERACTIONS_FILE, record).await
    }

    async fn get_interaction(&self, id: Uuid) -> Result<Option<InteractionRecord>, StoreError> {
        let records: Vec<InteractionRecord> = read_lines(&self.path(INTERACTIONS_FILE)).await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        self.append_line(FEEDBACK_FILE, record).await
    }

    async fn feedback_history(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError> {
        let feedback: Vec<FeedbackRecord> = read_lines(&self.path(FEEDBACK_FILE)).await?;
        let interactions: Vec<InteractionRecord> =
            read_lines(&self.path(INTERACTIONS_FILE)).await?;
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
        let records: Vec<InteractionRecord> = read_lines(&self.path(INTERACTIONS_FILE)).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.org_id == org_id && r.created_at >= since)
            .collect())
    }

    async fn feedback_since(
        &self,
        org_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedbackRecord>, StoreError> {
        let records: Vec<FeedbackRecord> = read_lines(&self.path(FEEDBACK_FILE)).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.org_id == org_id && r.created_at >= since)
            .collect())
    }
}

#[async_trait]
impl PolicyStore for JsonFileStore {
    async fn load_or_init(&self, org_id: Uuid) -> Result<Policy, StoreError> {
        if let Some(policy) = self.read_policies().await?.remove(&org_id) {
            return Ok(policy);
        }
        self.edit_policy(org_id, |_| {}).await
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
