use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("missing required configuration: {name}")]
    ConfigMissing { name: String },

    #[error("invalid configuration '{name}': {reason}")]
    ConfigInvalid { name: String, reason: String },

    #[error("upkeep check failed: {0}")]
    ReadFailure(#[source] ChainError),

    #[error("upkeep submission failed: {0}")]
    SubmitFailure(#[source] ChainError),

    #[error("transaction {tx} not terminal after {}s; outcome unknown", .after.as_secs())]
    ConfirmationTimeout { tx: String, after: Duration },

    #[error("transaction {tx} failed on-chain: {reason}")]
    ConfirmationFailure { tx: String, reason: String },

    #[error("lost track of transaction {tx}: {source}")]
    ConfirmationUnknown {
        tx: String,
        #[source]
        source: ChainError,
    },

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl KeeperError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::ConfigMissing { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a chain reader or writer implementation.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by node: {0}")]
    Rejected(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid transaction handle: {0}")]
    InvalidHandle(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Errors raised by an outcome sink. Never propagated past the reporter.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, KeeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_names_the_setting() {
        assert_eq!(
            KeeperError::missing("KEEPER_PRIVATE_KEY").to_string(),
            "missing required configuration: KEEPER_PRIVATE_KEY"
        );
    }

    #[test]
    fn tick_errors_carry_their_source() {
        let read = KeeperError::ReadFailure(ChainError::Transport("connection refused".into()));
        assert_eq!(
            read.to_string(),
            "upkeep check failed: transport error: connection refused"
        );
        let timeout = KeeperError::ConfirmationTimeout {
            tx: "0xabc".into(),
            after: Duration::from_secs(180),
        };
        assert!(timeout.to_string().contains("180s"));
        assert!(timeout.to_string().contains("unknown"));
    }

    #[test]
    fn invalid_message_names_the_setting() {
        let err = KeeperError::invalid("KEEPER_REGISTRY", "not an address");
        assert_eq!(
            err.to_string(),
            "invalid configuration 'KEEPER_REGISTRY': not an address"
        );
    }
}
