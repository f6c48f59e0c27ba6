//! Reader/writer seam between the keeper loop and the chain.
//!
//! The keeper never interprets upkeep payloads: whatever the reader returns
//! as `payload` is handed to the writer byte-for-byte.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Result of one registry check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpkeepDecision {
    pub needed: bool,
    /// Opaque execution payload. Meaningful only when `needed` is true.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl UpkeepDecision {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn due(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            needed: true,
            payload: payload.into(),
        }
    }
}

/// Handle of a submitted transaction (the transaction hash as a hex string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(String);

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network state of a submitted transaction after waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TerminalStatus {
    /// Included and executed successfully.
    Confirmed { block: Option<u64> },
    /// Included but reverted, or rejected by the network.
    Failed { reason: String },
    /// Not terminal within the wait bound. May still confirm later.
    Unknown,
}

/// Read side: evaluates the registry's "is upkeep needed" predicate.
///
/// Implementations must be side-effect free so the keeper can call them on
/// every tick.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn evaluate(&self, query: &[u8]) -> Result<UpkeepDecision, ChainError>;
}

/// Write side: submits the execution transaction and tracks its inclusion.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, ChainError>;

    /// Wait until `handle` is terminal or `timeout` elapses (`Unknown`).
    async fn await_terminal(
        &self,
        handle: &TxHandle,
        timeout: Duration,
    ) -> Result<TerminalStatus, ChainError>;
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
