//! Startup wiring shared by the subcommands: effective configuration,
//! credential loading and the chain-backed `KeeperContext`.
//!
//! Everything here runs before the first network call, so any error it
//! returns is a fatal configuration error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use keeper_chain::{parse_registry, KeeperWallet, RegistryClient};
use keeper_core::config::{ConfigOverrides, KeeperConfig, WarnLevel};
use keeper_core::credential::CREDENTIAL_ENV;
use keeper_core::{Credential, KeeperContext};

// ---------------------------------------------------------------------------
// Configuration flags
// ---------------------------------------------------------------------------

/// Flags and environment variables layered over the YAML config file.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML config file
    #[arg(long, global = true, env = "KEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the chain node
    #[arg(long, global = true, env = "KEEPER_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Registry contract address
    #[arg(long, global = true, env = "KEEPER_REGISTRY")]
    pub registry: Option<String>,

    /// Seconds between upkeep checks
    #[arg(long, global = true, env = "KEEPER_POLL_INTERVAL_SECS")]
    pub interval: Option<u64>,

    /// Seconds to wait for a submitted transaction before giving up on it
    #[arg(long, global = true)]
    pub confirm_timeout: Option<u64>,

    /// Bind address for the HTTP status server (disabled when unset)
    #[arg(long, global = true, env = "KEEPER_STATUS_ADDR")]
    pub status_addr: Option<String>,
}

impl ConfigArgs {
    /// Defaults, then the config file, then flags and environment.
    pub fn effective(&self) -> anyhow::Result<KeeperConfig> {
        let mut config = KeeperConfig::load_or_default(self.config.as_deref())
            .with_context(|| match &self.config {
                Some(path) => format!("failed to load config {}", path.display()),
                None => "failed to load config".to_string(),
            })?;
        config.apply(ConfigOverrides {
            rpc_url: self.rpc_url.clone(),
            registry: self.registry.clone(),
            poll_interval_secs: self.interval,
            confirm_timeout_secs: self.confirm_timeout,
            status_bind: self.status_addr.clone(),
        });
        Ok(config)
    }
}

/// Log warnings and fail on validation errors.
pub fn ensure_valid(config: &KeeperConfig) -> anyhow::Result<()> {
    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    if KeeperConfig::has_errors(&warnings) {
        // Typed errors first for the settings that have one.
        config.require_registry()?;
        config.check_data_bytes()?;
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Read and validate the signing credential from the environment.
pub fn load_wallet() -> anyhow::Result<KeeperWallet> {
    let raw = std::env::var(CREDENTIAL_ENV).ok();
    let loaded = Credential::load(raw.as_deref())?;
    let wallet = KeeperWallet::from_credential(&loaded.credential)?;
    Ok(wallet)
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Build the chain client and the context every tick runs against.
pub fn build_context(config: &KeeperConfig, wallet: KeeperWallet) -> anyhow::Result<KeeperContext> {
    let registry = parse_registry(config.require_registry()?)?;
    let query = config.check_data_bytes()?;
    let identity = wallet.identity().clone();

    let client = Arc::new(RegistryClient::connect(
        &config.rpc_url,
        registry,
        wallet.into_signer(),
        config.schedule.receipt_poll(),
    )?);

    tracing::info!(
        identity = %identity,
        rpc_url = %config.rpc_url,
        registry = %registry,
        "keeper identity loaded"
    );

    Ok(
        KeeperContext::new(client.clone(), client, identity, registry.to_string())
            .with_query(query),
    )
}
