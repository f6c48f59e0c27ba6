//! Per-tick outcome reporting.
//!
//! The [`Reporter`] fans each [`Outcome`] out to a set of [`OutcomeSink`]s.
//! Sink failures (errors or panics) are logged and swallowed so they can
//! never change a tick's result or stop the scheduler.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::chain::TxHandle;
use crate::error::ReportError;

// ---------------------------------------------------------------------------
// OutcomeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    NoOp,
    Submitted,
    Confirmed,
    Failed,
    Errored,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        }
    }

    /// Every kind except `Submitted` ends a tick.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub tick: u64,
    pub kind: OutcomeKind,
    pub identity: String,
    pub registry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxHandle>,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl Outcome {
    pub fn new(tick: u64, kind: OutcomeKind, identity: &str, registry: &str) -> Self {
        Self {
            tick,
            kind,
            identity: identity.to_string(),
            registry: registry.to_string(),
            tx: None,
            elapsed_ms: 0,
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn with_tx(mut self, tx: &TxHandle) -> Self {
        self.tx = Some(tx.clone());
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

pub trait OutcomeSink: Send + Sync {
    fn name(&self) -> &str;

    fn record(&self, outcome: &Outcome) -> Result<(), ReportError>;
}

/// Emits one structured `tracing` event per outcome.
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn record(&self, o: &Outcome) -> Result<(), ReportError> {
        let tx = o.tx.as_ref().map(TxHandle::as_str).unwrap_or("-");
        let detail = o.detail.as_deref().unwrap_or("");
        match o.kind {
            OutcomeKind::Failed | OutcomeKind::Errored => tracing::warn!(
                tick = o.tick,
                outcome = %o.kind,
                identity = %o.identity,
                registry = %o.registry,
                tx,
                elapsed_ms = o.elapsed_ms,
                detail,
                "upkeep tick"
            ),
            _ => tracing::info!(
                tick = o.tick,
                outcome = %o.kind,
                identity = %o.identity,
                registry = %o.registry,
                tx,
                elapsed_ms = o.elapsed_ms,
                "upkeep tick"
            ),
        }
        Ok(())
    }
}

/// Bounded in-memory history of recent outcomes plus a live broadcast feed.
pub struct OutcomeHistory {
    capacity: usize,
    recent: Mutex<VecDeque<Outcome>>,
    counts: Mutex<OutcomeCounts>,
    tx: broadcast::Sender<Outcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub no_op: u64,
    pub submitted: u64,
    pub confirmed: u64,
    pub failed: u64,
    pub errored: u64,
}

impl OutcomeCounts {
    pub fn add(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::NoOp => self.no_op += 1,
            OutcomeKind::Submitted => self.submitted += 1,
            OutcomeKind::Confirmed => self.confirmed += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Errored => self.errored += 1,
        }
    }

    /// Number of ticks that reached a terminal outcome.
    pub fn ticks(&self) -> u64 {
        self.no_op + self.confirmed + self.failed + self.errored
    }
}

impl OutcomeHistory {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            capacity: capacity.max(1),
            recent: Mutex::new(VecDeque::new()),
            counts: Mutex::new(OutcomeCounts::default()),
            tx,
        }
    }

    /// Most recent outcomes, oldest first.
    pub fn recent(&self) -> Vec<Outcome> {
        self.recent
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counts.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outcome> {
        self.tx.subscribe()
    }
}

impl OutcomeSink for OutcomeHistory {
    fn name(&self) -> &str {
        "history"
    }

    fn record(&self, outcome: &Outcome) -> Result<(), ReportError> {
        {
            let mut recent = self
                .recent
                .lock()
                .map_err(|_| ReportError::Unavailable("history lock poisoned".into()))?;
            if recent.len() == self.capacity {
                recent.pop_front();
            }
            recent.push_back(outcome.clone());
        }
        if let Ok(mut counts) = self.counts.lock() {
            counts.add(outcome.kind);
        }
        // No subscribers is not an error.
        let _ = self.tx.send(outcome.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct Reporter {
    sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Forward `outcome` to every sink. Never fails.
    pub fn report(&self, outcome: &Outcome) {
        for sink in &self.sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.record(outcome))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(sink = sink.name(), error = %e, "outcome sink failed");
                }
                Err(_) => {
                    tracing::error!(sink = sink.name(), "outcome sink panicked");
                }
            }
        }
    }
}
