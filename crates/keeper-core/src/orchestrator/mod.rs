//! Tick-rate orchestrator.
//!
//! Provides `Evaluator`, which runs one check-then-execute tick, and
//! `Scheduler`, which drives ticks at a fixed interval with at most one in
//! flight. `keeper run` wires both to the chain adapter and the reporter.

pub mod evaluator;
pub mod scheduler;

pub use evaluator::{Evaluator, TickPolicy, TickResult};
pub use scheduler::{RunSummary, Scheduler, SchedulerPhase};
