use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::RpcError;
use async_trait::async_trait;
use keeper_core::{
    ChainError, ChainReader, ChainWriter, KeeperError, TerminalStatus, TxHandle, UpkeepDecision,
};

sol! {
    /// Check/perform surface of an automation registry.
    #[sol(rpc)]
    interface IAutomationRegistry {
        function checkUpkeep(bytes calldata checkData)
            external
            view
            returns (bool upkeepNeeded, bytes memory performData);

        function performUpkeep(bytes calldata performData) external;
    }
}

// ---------------------------------------------------------------------------
// RegistryClient
// ---------------------------------------------------------------------------

/// JSON-RPC client bound to one registry contract and one signing account.
#[derive(Clone)]
pub struct RegistryClient {
    provider: DynProvider,
    registry: Address,
    receipt_poll: Duration,
}

impl RegistryClient {
    /// Build a client. No network traffic happens until the first call.
    pub fn connect(
        rpc_url: &str,
        registry: Address,
        signer: PrivateKeySigner,
        receipt_poll: Duration,
    ) -> keeper_core::Result<Self> {
        let url: reqwest::Url = rpc_url
            .trim()
            .parse()
            .map_err(|e| KeeperError::invalid("KEEPER_RPC_URL", format!("'{rpc_url}': {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(Self {
            provider,
            registry,
            receipt_poll: receipt_poll.max(Duration::from_millis(1)),
        })
    }

    fn contract(&self) -> IAutomationRegistry::IAutomationRegistryInstance<DynProvider> {
        IAutomationRegistry::new(self.registry, self.provider.clone())
    }

    async fn poll_receipt(&self, hash: TxHash) -> TerminalStatus {
        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    return if receipt.status() {
                        TerminalStatus::Confirmed {
                            block: receipt.block_number(),
                        }
                    } else {
                        TerminalStatus::Failed {
                            reason: "execution reverted".to_string(),
                        }
                    };
                }
                Ok(None) => {}
                // Transient; the caller's deadline bounds how long we keep trying.
                Err(e) => tracing::debug!(tx = %hash, error = %e, "receipt lookup failed"),
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}

#[async_trait]
impl ChainReader for RegistryClient {
    async fn evaluate(&self, query: &[u8]) -> Result<UpkeepDecision, ChainError> {
        let ret = self
            .contract()
            .checkUpkeep(Bytes::copy_from_slice(query))
            .call()
            .await
            .map_err(classify)?;
        Ok(UpkeepDecision {
            needed: ret.upkeepNeeded,
            payload: ret.performData.to_vec(),
        })
    }
}

#[async_trait]
impl ChainWriter for RegistryClient {
    async fn submit(&self, payload: &[u8]) -> Result<TxHandle, ChainError> {
        let pending = self
            .contract()
            .performUpkeep(Bytes::copy_from_slice(payload))
            .send()
            .await
            .map_err(classify)?;
        let hash = *pending.tx_hash();
        tracing::debug!(tx = %hash, registry = %self.registry, "performUpkeep sent");
        Ok(TxHandle::new(hash.to_string()))
    }

    async fn await_terminal(
        &self,
        handle: &TxHandle,
        timeout: Duration,
    ) -> Result<TerminalStatus, ChainError> {
        let hash: TxHash = handle
            .as_str()
            .parse()
            .map_err(|e| ChainError::InvalidHandle(format!("{handle}: {e}")))?;
        match tokio::time::timeout(timeout, self.poll_receipt(hash)).await {
            Ok(status) => Ok(status),
            Err(_) => Ok(TerminalStatus::Unknown),
        }
    }
}

/// Node error responses (reverts, nonce or funding problems) are rejections;
/// anything that never reached a node is a transport failure.
fn classify(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(RpcError::ErrorResp(payload)) => {
            ChainError::Rejected(payload.message.to_string())
        }
        alloy::contract::Error::TransportError(e) => ChainError::Transport(e.to_string()),
        other => ChainError::Decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    // Nothing listens on port 1.
    const DEAD_RPC: &str = "http://127.0.0.1:1";

    fn client(rpc_url: &str) -> RegistryClient {
        RegistryClient::connect(
            rpc_url,
            REGISTRY.parse().unwrap(),
            PrivateKeySigner::random(),
            Duration::from_millis(10),
        )
        .unwrap()
    }

    #[test]
    fn selectors_match_registry_abi() {
        assert_eq!(
            hex::encode(IAutomationRegistry::checkUpkeepCall::SELECTOR),
            "6e04ff0d"
        );
        assert_eq!(
            hex::encode(IAutomationRegistry::performUpkeepCall::SELECTOR),
            "4585e33b"
        );
    }

    #[test]
    fn perform_payload_is_abi_wrapped_unchanged() {
        let payload = vec![0xde, 0xad, 0xbe, 0xef];
        let call = IAutomationRegistry::performUpkeepCall {
            performData: Bytes::from(payload.clone()),
        };
        let decoded =
            IAutomationRegistry::performUpkeepCall::abi_decode(&call.abi_encode()).unwrap();
        assert_eq!(decoded.performData.to_vec(), payload);
    }

    #[test]
    fn bad_rpc_url_is_config_invalid() {
        let err = RegistryClient::connect(
            "not a url",
            REGISTRY.parse().unwrap(),
            PrivateKeySigner::random(),
            Duration::from_secs(1),
        )
        .err()
        .unwrap();
        assert!(matches!(err, KeeperError::ConfigInvalid { ref name, .. } if name == "KEEPER_RPC_URL"));
    }

    #[tokio::test]
    async fn unreachable_node_is_transport_error() {
        let err = client(DEAD_RPC).evaluate(&[]).await.unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)), "got {err}");
    }

    #[tokio::test]
    async fn malformed_handle_is_rejected_before_polling() {
        let err = client(DEAD_RPC)
            .await_terminal(&TxHandle::new("0x1234"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidHandle(_)));
    }

    #[tokio::test]
    async fn receipt_wait_past_deadline_is_unknown() {
        let handle = TxHandle::new(format!("0x{}", "ab".repeat(32)));
        let status = client(DEAD_RPC)
            .await_terminal(&handle, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(status, TerminalStatus::Unknown);
    }
}
