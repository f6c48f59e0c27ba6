//! `keeper-chain` — the EVM side of the upkeep keeper.
//!
//! Implements [`keeper_core::ChainReader`] and [`keeper_core::ChainWriter`]
//! against an automation registry contract over JSON-RPC.
//!
//! ```text
//! Credential ──► KeeperWallet ──► Identity (checksummed address)
//!                    │
//!                    ▼
//! rpc_url ─────► RegistryClient
//!                    ├─ evaluate  → eth_call checkUpkeep(checkData)
//!                    ├─ submit    → eth_sendRawTransaction performUpkeep(performData)
//!                    └─ await_terminal → eth_getTransactionReceipt (polled)
//! ```

pub mod registry;
pub mod wallet;

pub use registry::{IAutomationRegistry, RegistryClient};
pub use wallet::{parse_registry, KeeperWallet};
