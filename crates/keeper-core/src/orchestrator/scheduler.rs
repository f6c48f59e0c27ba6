//! Poll scheduler: one tick immediately, then one per interval, never two at
//! once.
//!
//! Phase transitions: `Idle → Ticking → Idle`, repeating until the
//! cancellation token fires or the optional tick limit is reached, after
//! which the phase is `Stopped`. A tick that outlasts the interval defers the
//! next one; ticks are never skipped and never overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{KeeperError, Result};
use crate::orchestrator::evaluator::{Evaluator, TickResult};
use crate::report::{OutcomeCounts, OutcomeKind};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SchedulerPhase {
    Idle,
    Ticking {
        tick: u64,
        started_at: DateTime<Utc>,
    },
    Stopped,
}

/// Totals for one `run` of the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub counts: OutcomeCounts,
}

impl RunSummary {
    fn record(&mut self, result: &TickResult) {
        self.ticks += 1;
        if result.tx.is_some() {
            self.counts.add(OutcomeKind::Submitted);
        }
        self.counts.add(result.outcome);
    }
}

pub struct Scheduler {
    evaluator: Evaluator,
    interval: Duration,
    max_ticks: Option<u64>,
    phase: watch::Sender<SchedulerPhase>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(evaluator: Evaluator, interval: Duration) -> Self {
        let (phase, _) = watch::channel(SchedulerPhase::Idle);
        Self {
            evaluator,
            interval: interval.max(MIN_INTERVAL),
            max_ticks: None,
            phase,
            running: AtomicBool::new(false),
        }
    }

    /// Stop after `max` ticks instead of running until cancelled.
    pub fn with_max_ticks(mut self, max: u64) -> Self {
        self.max_ticks = Some(max);
        self
    }

    /// Watch the scheduler's phase.
    pub fn phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.phase.subscribe()
    }

    /// Run the poll loop until `cancel` fires or the tick limit is reached.
    ///
    /// Cancellation is observed between ticks; a tick in flight always runs
    /// to completion and reports before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(KeeperError::AlreadyRunning);
        }
        let _running = RunningGuard(self);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            identity = %self.evaluator.context().identity,
            registry = %self.evaluator.context().registry,
            "keeper loop started"
        );
        let summary = self.run_loop(&cancel).await;
        tracing::info!(
            ticks = summary.ticks,
            confirmed = summary.counts.confirmed,
            failed = summary.counts.failed,
            errored = summary.counts.errored,
            "keeper loop stopped"
        );
        Ok(summary)
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> RunSummary {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = RunSummary::default();
        let mut next_tick = 1u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.enter_ticking(next_tick) {
                tracing::error!(tick = next_tick, "previous tick still in flight; deferring");
                continue;
            }
            let result = self.evaluator.tick(next_tick).await;
            self.phase.send_replace(SchedulerPhase::Idle);

            summary.record(&result);
            next_tick += 1;
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
        }
        summary
    }

    /// `Idle → Ticking`. Refused while another tick holds the phase.
    fn enter_ticking(&self, tick: u64) -> bool {
        self.phase.send_if_modified(|phase| match phase {
            SchedulerPhase::Ticking { .. } => false,
            _ => {
                *phase = SchedulerPhase::Ticking {
                    tick,
                    started_at: Utc::now(),
                };
                true
            }
        })
    }
}

/// Marks the scheduler stopped and free to run again when `run` returns or
/// its future is dropped mid-tick.
struct RunningGuard<'a>(&'a Scheduler);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.phase.send_replace(SchedulerPhase::Stopped);
        self.0.running.store(false, Ordering::Release);
    }
}
