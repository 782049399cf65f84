//! Wallet-backed session signing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::credential::{SessionCredential, SessionKeyRequest};
use crate::error::GateError;
use crate::ports::{Result, SigningService};
use crate::types::Address;

/// A wallet that can sign a personal message for one of its accounts.
#[async_trait]
pub trait PersonalMessageWallet: Send + Sync {
    /// Returns the signature, hex or base64 encoded as the wallet prefers.
    async fn sign_personal_message(&self, address: &Address, message: &[u8]) -> Result<String>;
}

/// [`SigningService`] that asks a wallet to sign the request's personal message.
pub struct WalletSessionSigner<W> {
    wallet: W,
}

impl<W: PersonalMessageWallet> WalletSessionSigner<W> {
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl<W: PersonalMessageWallet> SigningService for WalletSessionSigner<W> {
    async fn sign(&self, request: &SessionKeyRequest) -> Result<SessionCredential> {
        let message = request.personal_message();
        let signature = self
            .wallet
            .sign_personal_message(&request.address, message.as_bytes())
            .await?;
        tracing::debug!(address = %request.address, "personal message signed");
        Ok(request.clone().into_credential(signature))
    }
}

/// Deterministic wallet for fixtures: signs with SHA-256 over address and message.
///
/// Only accounts it was created with can sign; any other address is rejected
/// the way a real wallet rejects a foreign account.
#[derive(Debug, Clone, Default)]
pub struct LocalWallet {
    accounts: Vec<Address>,
    reject_all: bool,
}

impl LocalWallet {
    pub fn new(accounts: impl IntoIterator<Item = Address>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
            reject_all: false,
        }
    }

    /// A wallet whose user declines every prompt.
    pub fn rejecting() -> Self {
        Self {
            accounts: Vec::new(),
            reject_all: true,
        }
    }
}

#[async_trait]
impl PersonalMessageWallet for LocalWallet {
    async fn sign_personal_message(&self, address: &Address, message: &[u8]) -> Result<String> {
        if self.reject_all {
            return Err(GateError::Signing("user rejected the request".to_string()));
        }
        if !self.accounts.contains(address) {
            return Err(GateError::Signing(format!("unknown account {address}")));
        }
        let mut hasher = Sha256::new();
        hasher.update(address.as_str().as_bytes());
        hasher.update(message);
        Ok(hex::encode(hasher.finalize()))
    }
}
