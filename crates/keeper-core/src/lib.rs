pub mod chain;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod orchestrator;
pub mod report;

#[cfg(test)]
mod testing;

pub use chain::{ChainReader, ChainWriter, TerminalStatus, TxHandle, UpkeepDecision};
pub use context::KeeperContext;
pub use credential::{Credential, Identity, LoadedCredential};
pub use error::{ChainError, KeeperError, ReportError, Result};
