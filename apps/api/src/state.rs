use std::sync::Arc;

use crate::consultation::pipeline::ConsultationPipeline;
use crate::storage::{InteractionStore, PolicyStore};
use crate::submission_guard::SubmissionGuard;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ConsultationPipeline,
    /// Same backend the pipeline appends to; read by feedback and dashboard.
    pub interactions: Arc<dyn InteractionStore>,
    pub policies: Arc<dyn PolicyStore>,
    /// One submission in flight per session. In-memory or Redis, per GUARD_BACKEND.
    pub guard: Arc<dyn SubmissionGuard>,
}
