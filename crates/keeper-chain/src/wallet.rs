use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use keeper_core::credential::CREDENTIAL_ENV;
use keeper_core::{Credential, Identity, KeeperError, Result};

/// Signing key plus the account identity derived from it.
pub struct KeeperWallet {
    signer: PrivateKeySigner,
    identity: Identity,
}

impl KeeperWallet {
    /// Derive the signer from a loaded credential.
    ///
    /// A well-formed key can still be outside the curve order (all zeros,
    /// for instance); that is reported as an invalid credential.
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        let secret = B256::from(credential.to_bytes());
        let signer = PrivateKeySigner::from_bytes(&secret)
            .map_err(|e| KeeperError::invalid(CREDENTIAL_ENV, format!("not a valid signing key: {e}")))?;
        let identity = Identity::new(signer.address().to_string());
        Ok(Self { signer, identity })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn into_signer(self) -> PrivateKeySigner {
        self.signer
    }
}

impl std::fmt::Debug for KeeperWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeperWallet")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Parse the registry contract address.
pub fn parse_registry(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| KeeperError::invalid("KEEPER_REGISTRY", format!("'{}': {e}", raw.trim())))
}
