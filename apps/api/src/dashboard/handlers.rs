use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::dashboard::metrics::{
    compute_dashboard, DashboardSummary, DEFAULT_WINDOW_DAYS, WINDOW_DAYS,
};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub org_id: Uuid,
    pub days: Option<u32>,
}

/// GET /api/v1/dashboard?org_id=&days=
///
/// KPI summary over the last 7, 28 (default) or 90 days.
pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !WINDOW_DAYS.contains(&days) {
        return Err(AppError::Validation(format!("days must be one of {WINDOW_DAYS:?}")));
    }

    let since = Utc::now() - Duration::days(i64::from(days));
    let interactions = state.interactions.interactions_since(query.org_id, since).await?;
    let feedback = state.interactions.feedback_since(query.org_id, since).await?;
    let policy = state.policies.load_or_init(query.org_id).await?;

    Ok(Json(compute_dashboard(days, &interactions, &feedback, &policy)))
}
