use crate::error::{KeeperError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Bound on waiting for a submitted transaction to become terminal.
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
    /// Bound on a single read or submit request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_receipt_poll")]
    pub receipt_poll_millis: u64,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_confirm_timeout() -> u64 {
    180
}

fn default_request_timeout() -> u64 {
    30
}

fn default_receipt_poll() -> u64 {
    2_000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            confirm_timeout_secs: default_confirm_timeout(),
            request_timeout_secs: default_request_timeout(),
            receipt_poll_millis: default_receipt_poll(),
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_millis)
    }
}

// ---------------------------------------------------------------------------
// ReadRetryConfig
// ---------------------------------------------------------------------------

/// Backoff policy for the read path. Submissions are never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRetryConfig {
    /// Total attempts per tick, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_millis: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_millis: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    8_000
}

impl Default for ReadRetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_millis: default_base_delay(),
            max_delay_millis: default_max_delay(),
        }
    }
}

impl ReadRetryConfig {
    /// Delay before retry number `attempt` (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .base_delay_millis
            .saturating_mul(factor)
            .min(self.max_delay_millis);
        Duration::from_millis(millis)
    }
}

// ---------------------------------------------------------------------------
// StatusConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Address for the HTTP status server. Disabled when unset.
    #[serde(default)]
    pub bind: Option<String>,
    /// Number of recent outcomes kept for `/api/status`.
    #[serde(default = "default_history")]
    pub history: usize,
}

fn default_history() -> usize {
    100
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            bind: None,
            history: default_history(),
        }
    }
}

// ---------------------------------------------------------------------------
// KeeperConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Registry contract address. Required to run.
    #[serde(default)]
    pub registry: Option<String>,
    /// Hex-encoded query passed to every upkeep check.
    #[serde(default = "default_check_data")]
    pub check_data: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub read_retry: ReadRetryConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_check_data() -> String {
    "0x".to_string()
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            registry: None,
            check_data: default_check_data(),
            schedule: ScheduleConfig::default(),
            read_retry: ReadRetryConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

/// Values from flags or environment that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub registry: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub confirm_timeout_secs: Option<u64>,
    pub status_bind: Option<String>,
}

impl KeeperConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: KeeperConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.rpc_url {
            self.rpc_url = url;
        }
        if let Some(registry) = overrides.registry {
            self.registry = Some(registry);
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.schedule.poll_interval_secs = secs;
        }
        if let Some(secs) = overrides.confirm_timeout_secs {
            self.schedule.confirm_timeout_secs = secs;
        }
        if let Some(bind) = overrides.status_bind {
            self.status.bind = Some(bind);
        }
    }

    /// The configured registry address, or `ConfigMissing`.
    pub fn require_registry(&self) -> Result<&str> {
        self.registry
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| KeeperError::missing("KEEPER_REGISTRY"))
    }

    /// Decoded `check_data` bytes.
    pub fn check_data_bytes(&self) -> Result<Vec<u8>> {
        let trimmed = self.check_data.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        hex::decode(digits).map_err(|e| KeeperError::invalid("check_data", e.to_string()))
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.rpc_url.trim().is_empty() {
            warnings.push(ConfigWarning::error("rpc_url is empty"));
        }
        if self.require_registry().is_err() {
            warnings.push(ConfigWarning::error(
                "registry is not set (config file, --registry or KEEPER_REGISTRY)",
            ));
        }
        if let Err(e) = self.check_data_bytes() {
            warnings.push(ConfigWarning::error(e.to_string()));
        }
        if self.schedule.poll_interval_secs == 0 {
            warnings.push(ConfigWarning::error(
                "schedule.poll_interval_secs must be greater than 0",
            ));
        }
        if self.schedule.confirm_timeout_secs == 0 {
            warnings.push(ConfigWarning::error(
                "schedule.confirm_timeout_secs must be greater than 0",
            ));
        }
        if self.schedule.request_timeout_secs == 0 {
            warnings.push(ConfigWarning::error(
                "schedule.request_timeout_secs must be greater than 0",
            ));
        }
        if self.schedule.receipt_poll_millis == 0 {
            warnings.push(ConfigWarning::error(
                "schedule.receipt_poll_millis must be greater than 0",
            ));
        }
        if self.read_retry.attempts == 0 {
            warnings.push(ConfigWarning::error(
                "read_retry.attempts must be at least 1",
            ));
        }
        if self.read_retry.max_delay_millis < self.read_retry.base_delay_millis {
            warnings.push(ConfigWarning::warning(
                "read_retry.max_delay_millis is below base_delay_millis; every retry waits max_delay_millis",
            ));
        }
        if self.schedule.confirm_timeout_secs > 0
            && self.schedule.receipt_poll_millis
                > self.schedule.confirm_timeout_secs.saturating_mul(1_000)
        {
            warnings.push(ConfigWarning::warning(
                "schedule.receipt_poll_millis exceeds the confirmation timeout; receipts are polled once",
            ));
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}
