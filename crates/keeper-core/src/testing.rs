//! In-memory reader, writer and sink doubles for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::chain::{ChainReader, ChainWriter, TerminalStatus, TxHandle, UpkeepDecision};
use crate::context::KeeperContext;
use crate::credential::Identity;
use crate::error::{ChainError, ReportError};
use crate::report::{Outcome, OutcomeKind, OutcomeSink};

pub(crate) const IDENTITY: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub(crate) const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

// ---------------------------------------------------------------------------
// ScriptedReader
// ---------------------------------------------------------------------------

pub(crate) struct ScriptedReader {
    script: Mutex<VecDeque<Result<UpkeepDecision, ChainError>>>,
    fallback: Result<UpkeepDecision, ChainError>,
    latency: Duration,
    calls: AtomicUsize,
    pub(crate) started: Mutex<Vec<Instant>>,
    pub(crate) queries: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedReader {
    pub(crate) fn always(decision: UpkeepDecision) -> Self {
        Self::scripted(vec![], Ok(decision))
    }

    pub(crate) fn failing(err: ChainError) -> Self {
        Self::scripted(vec![], Err(err))
    }

    /// Returns `script` results in order, then `fallback` forever.
    pub(crate) fn scripted(
        script: Vec<Result<UpkeepDecision, ChainError>>,
        fallback: Result<UpkeepDecision, ChainError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainReader for ScriptedReader {
    async fn evaluate(&self, query: &[u8]) -> Result<UpkeepDecision, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        self.queries.lock().unwrap().push(query.to_vec());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedWriter
// ---------------------------------------------------------------------------

pub(crate) struct ScriptedWriter {
    submit_error: Option<ChainError>,
    wait_error: Option<ChainError>,
    status: TerminalStatus,
    confirm_latency: Duration,
    submits: AtomicUsize,
    waits: AtomicUsize,
    pub(crate) payloads: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedWriter {
    pub(crate) fn confirming() -> Self {
        Self::with_status(TerminalStatus::Confirmed { block: Some(42) })
    }

    pub(crate) fn with_status(status: TerminalStatus) -> Self {
        Self {
            submit_error: None,
            wait_error: None,
            status,
            confirm_latency: Duration::ZERO,
            submits: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_submit(err: ChainError) -> Self {
        let mut writer = Self::confirming();
        writer.submit_error = Some(err);
        writer
    }

    pub(crate) fn failing_wait(err: ChainError) -> Self {
        let mut writer = Self::confirming();
        writer.wait_error = Some(err);
        writer
    }

    /// Sleep this long inside `await_terminal`, ignoring its timeout argument.
    pub(crate) fn with_confirm_latency(mut self, latency: Duration) -> Self {
        self.confirm_latency = latency;
        self
    }

    pub(crate) fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub(crate) fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainWriter for ScriptedWriter {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, ChainError> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        self.payloads.lock().unwrap().push(payload.to_vec());
        Ok(TxHandle::new(format!("0x{n:064x}")))
    }

    async fn await_terminal(
        &self,
        _handle: &TxHandle,
        _timeout: Duration,
    ) -> Result<TerminalStatus, ChainError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if !self.confirm_latency.is_zero() {
            tokio::time::sleep(self.confirm_latency).await;
        }
        match &self.wait_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.status.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Captures every outcome with the (possibly paused) tokio clock reading.
#[derive(Default)]
pub(crate) struct RecordingSink {
    seen: Mutex<Vec<(Outcome, Instant)>>,
}

impl RecordingSink {
    pub(crate) fn outcomes(&self) -> Vec<Outcome> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(o, _)| o.clone())
            .collect()
    }

    pub(crate) fn kinds(&self) -> Vec<OutcomeKind> {
        self.outcomes().iter().map(|o| o.kind).collect()
    }

    /// Clock readings of terminal outcomes, one per finished tick.
    pub(crate) fn tick_ends(&self) -> Vec<Instant> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o.kind.is_terminal())
            .map(|(_, at)| *at)
            .collect()
    }
}

impl OutcomeSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn record(&self, outcome: &Outcome) -> Result<(), ReportError> {
        self.seen
            .lock()
            .unwrap()
            .push((outcome.clone(), Instant::now()));
        Ok(())
    }
}

pub(crate) fn context(reader: Arc<ScriptedReader>, writer: Arc<ScriptedWriter>) -> KeeperContext {
    KeeperContext::new(reader, writer, Identity::new(IDENTITY), REGISTRY)
}
