use std::sync::Arc;

use chrono::{DateTime, Utc};
use keeper_core::orchestrator::SchedulerPhase;
use keeper_core::report::OutcomeHistory;
use keeper_core::Identity;
use tokio::sync::watch;

/// Shared, read-only view of a running keeper.
#[derive(Clone)]
pub struct StatusState {
    pub history: Arc<OutcomeHistory>,
    pub identity: Identity,
    pub registry: String,
    pub phase: watch::Receiver<SchedulerPhase>,
    pub started_at: DateTime<Utc>,
}

impl StatusState {
    pub fn new(
        history: Arc<OutcomeHistory>,
        identity: Identity,
        registry: impl Into<String>,
        phase: watch::Receiver<SchedulerPhase>,
    ) -> Self {
        Self {
            history,
            identity,
            registry: registry.into(),
            phase,
            started_at: Utc::now(),
        }
    }
}
