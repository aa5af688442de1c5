//! Double-submit guard — at most one consultation in flight per session.
//!
//! The handler holds a `SubmissionPermit` while the pipeline runs. Dropping the
//! permit (including when the request future is cancelled) releases the session.
//! The Redis guard also sets a TTL so a crashed process cannot wedge a session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("guard state poisoned")]
    Poisoned,
}

#[async_trait]
pub trait SubmissionGuard: Send + Sync {
    /// Returns `false` when the session already has a submission in flight.
    async fn try_acquire(&self, session_id: &str) -> Result<bool, GuardError>;

    async fn release(&self, session_id: &str) -> Result<(), GuardError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process guard
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryGuard {
    in_flight: Mutex<HashSet<String>>,
}

impl InMemoryGuard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionGuard for InMemoryGuard {
    async fn try_acquire(&self, session_id: &str) -> Result<bool, GuardError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| GuardError::Poisoned)?;
        Ok(in_flight.insert(session_id.to_string()))
    }

    async fn release(&self, session_id: &str) -> Result<(), GuardError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| GuardError::Poisoned)?;
        in_flight.remove(session_id);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis guard (shared across replicas)
// ────────────────────────────────────────────────────────────────────────────

const KEY_PREFIX: &str = "albert:submission:";

pub struct RedisGuard {
    client: redis::Client,
    ttl: Duration,
}

impl RedisGuard {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }
}

#[async_trait]
impl SubmissionGuard for RedisGuard {
    async fn try_acquire(&self, session_id: &str) -> Result<bool, GuardError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SET NX replies OK when the key was set and nil when it already existed
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(session_id))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, session_id: &str) -> Result<(), GuardError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(Self::key(session_id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Permit
// ────────────────────────────────────────────────────────────────────────────

/// Proof that a session's submission slot is held.
///
/// `release` frees the slot in place. A permit dropped without `release`
/// frees it on a spawned task.
pub struct SubmissionPermit {
    guard: Arc<dyn SubmissionGuard>,
    session_id: String,
    armed: bool,
}

impl SubmissionPermit {
    /// Returns `None` when the session already has a submission in flight.
    pub async fn acquire(
        guard: Arc<dyn SubmissionGuard>,
        session_id: &str,
    ) -> Result<Option<Self>, GuardError> {
        if !guard.try_acquire(session_id).await? {
            return Ok(None);
        }
        Ok(Some(Self {
            guard,
            session_id: session_id.to_string(),
            armed: true,
        }))
    }

    pub async fn release(mut self) {
        if let Err(e) = self.guard.release(&self.session_id).await {
            warn!(session_id = %self.session_id, "Failed to release submission guard: {e}");
        }
        self.armed = false;
    }
}

impl Drop for SubmissionPermit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let guard = self.guard.clone();
        let session_id = std::mem::take(&mut self.session_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = guard.release(&session_id).await {
                        warn!(%session_id, "Failed to release abandoned submission guard: {e}");
                    }
                });
            }
            Err(_) => warn!(%session_id, "No runtime to release abandoned submission guard"),
        }
    }
}
