//! One upkeep tick: check the registry, conditionally execute, report.
//!
//! Every path through [`Evaluator::tick`] reports exactly one terminal
//! outcome and returns; no error escapes to the scheduler.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::chain::{TerminalStatus, TxHandle, UpkeepDecision};
use crate::config::{KeeperConfig, ReadRetryConfig};
use crate::context::KeeperContext;
use crate::error::{ChainError, KeeperError};
use crate::report::{Outcome, OutcomeKind, Reporter};

// ---------------------------------------------------------------------------
// TickPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TickPolicy {
    /// Bound on waiting for a submitted transaction to become terminal.
    pub confirm_timeout: Duration,
    /// Bound on each read attempt and on the submit call.
    pub request_timeout: Duration,
    pub read_retry: ReadRetryConfig,
}

impl Default for TickPolicy {
    fn default() -> Self {
        Self::from_config(&KeeperConfig::default())
    }
}

impl TickPolicy {
    pub fn from_config(config: &KeeperConfig) -> Self {
        Self {
            confirm_timeout: config.schedule.confirm_timeout(),
            request_timeout: config.schedule.request_timeout(),
            read_retry: config.read_retry.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TickResult
// ---------------------------------------------------------------------------

/// Terminal result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub tick: u64,
    /// The terminal outcome: no-op, confirmed, failed or errored.
    pub outcome: OutcomeKind,
    /// Set when a transaction was submitted during this tick.
    pub tx: Option<TxHandle>,
    pub elapsed: Duration,
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

pub struct Evaluator {
    ctx: KeeperContext,
    policy: TickPolicy,
    reporter: Reporter,
}

impl Evaluator {
    pub fn new(ctx: KeeperContext, policy: TickPolicy, reporter: Reporter) -> Self {
        Self {
            ctx,
            policy,
            reporter,
        }
    }

    pub fn context(&self) -> &KeeperContext {
        &self.ctx
    }

    /// Query the registry with read-path retries. Never writes, never reports.
    pub async fn check(&self) -> Result<UpkeepDecision, KeeperError> {
        let retry = &self.policy.read_retry;
        let attempts = retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.bounded(self.ctx.reader.evaluate(&self.ctx.query)).await {
                Ok(decision) => return Ok(decision),
                Err(e) if attempt < attempts => {
                    let delay = retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "upkeep check failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(KeeperError::ReadFailure(e)),
            }
        }
    }

    /// Run one full tick and report its outcome.
    pub async fn tick(&self, tick: u64) -> TickResult {
        let started = Instant::now();

        let decision = match self.check().await {
            Ok(decision) => decision,
            Err(e) => return self.finish(tick, started, OutcomeKind::Errored, None, Some(e)),
        };
        if !decision.needed {
            return self.finish(tick, started, OutcomeKind::NoOp, None, None);
        }

        let handle = match self.bounded(self.ctx.writer.submit(&decision.payload)).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = KeeperError::SubmitFailure(e);
                return self.finish(tick, started, OutcomeKind::Errored, None, Some(err));
            }
        };
        self.reporter.report(
            &self
                .outcome(tick, started, OutcomeKind::Submitted)
                .with_tx(&handle),
        );

        match self.confirm(&handle).await {
            Ok(block) => {
                tracing::debug!(tick, tx = %handle, ?block, "upkeep transaction confirmed");
                self.finish(tick, started, OutcomeKind::Confirmed, Some(handle), None)
            }
            Err(e @ KeeperError::ConfirmationFailure { .. }) => {
                self.finish(tick, started, OutcomeKind::Failed, Some(handle), Some(e))
            }
            Err(e) => self.finish(tick, started, OutcomeKind::Errored, Some(handle), Some(e)),
        }
    }

    /// Wait for `handle` to become terminal within the confirmation bound.
    ///
    /// The bound is applied here as well as passed to the writer, so a writer
    /// that ignores its timeout still cannot stall the loop.
    async fn confirm(&self, handle: &TxHandle) -> Result<Option<u64>, KeeperError> {
        let bound = self.policy.confirm_timeout;
        let waited =
            tokio::time::timeout(bound, self.ctx.writer.await_terminal(handle, bound)).await;
        match waited {
            Ok(Ok(TerminalStatus::Confirmed { block })) => Ok(block),
            Ok(Ok(TerminalStatus::Failed { reason })) => Err(KeeperError::ConfirmationFailure {
                tx: handle.to_string(),
                reason,
            }),
            Ok(Ok(TerminalStatus::Unknown)) | Err(_) => Err(KeeperError::ConfirmationTimeout {
                tx: handle.to_string(),
                after: bound,
            }),
            Ok(Err(source)) => Err(KeeperError::ConfirmationUnknown {
                tx: handle.to_string(),
                source,
            }),
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ChainError> {
        let limit = self.policy.request_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(limit)),
        }
    }

    fn outcome(&self, tick: u64, started: Instant, kind: OutcomeKind) -> Outcome {
        Outcome::new(tick, kind, self.ctx.identity.as_str(), &self.ctx.registry)
            .with_elapsed(started.elapsed())
    }

    fn finish(
        &self,
        tick: u64,
        started: Instant,
        kind: OutcomeKind,
        tx: Option<TxHandle>,
        error: Option<KeeperError>,
    ) -> TickResult {
        let mut outcome = self.outcome(tick, started, kind);
        if let Some(tx) = &tx {
            outcome = outcome.with_tx(tx);
        }
        let detail = error.map(|e| e.to_string());
        if let Some(detail) = &detail {
            outcome = outcome.with_detail(detail.clone());
        }
        self.reporter.report(&outcome);

        TickResult {
            tick,
            outcome: kind,
            tx,
            elapsed: started.elapsed(),
            detail,
        }
    }
}
