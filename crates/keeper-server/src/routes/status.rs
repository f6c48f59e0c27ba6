use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use keeper_core::orchestrator::SchedulerPhase;
use keeper_core::report::{Outcome, OutcomeCounts};
use serde::Serialize;

use crate::state::StatusState;

#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub identity: String,
    pub registry: String,
    pub started_at: DateTime<Utc>,
    pub phase: SchedulerPhase,
    pub counts: OutcomeCounts,
    /// Oldest first.
    pub recent: Vec<Outcome>,
}

/// GET /api/status — identity, scheduler phase, counts and recent outcomes.
pub async fn get_status(State(app): State<StatusState>) -> Json<StatusSnapshot> {
    let phase = app.phase.borrow().clone();
    Json(StatusSnapshot {
        identity: app.identity.to_string(),
        registry: app.registry.clone(),
        started_at: app.started_at,
        phase,
        counts: app.history.counts(),
        recent: app.history.recent(),
    })
}
