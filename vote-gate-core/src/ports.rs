//! Collaborator traits: the only way the gate reaches the outside world.
//!
//! The controller holds these as `Arc<dyn …>`; in-memory versions live in
//! [`crate::memory`], the HTTP query in `crate::http`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::casting::{CastReceipt, CastRequest};
use crate::credential::{SessionCredential, SessionKeyRequest};
use crate::error::GateError;
use crate::types::{DecryptedContent, PoolId, VotePoolRecord};

pub type Result<T> = std::result::Result<T, GateError>;

/// Reads vote pools.
#[async_trait]
pub trait VotePoolQuery: Send + Sync {
    /// `Ok(None)` when the pool does not exist.
    async fn fetch_pool(&self, id: &PoolId) -> Result<Option<VotePoolRecord>>;
}

/// Turns a session key request into a signed credential (wallet prompt).
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign(&self, request: &SessionKeyRequest) -> Result<SessionCredential>;
}

/// Opens sealed pool details.
#[async_trait]
pub trait SealService: Send + Sync {
    async fn decrypt(
        &self,
        credential: &SessionCredential,
        record: &VotePoolRecord,
    ) -> Result<DecryptedContent>;
}

/// Submits votes to a ballot box.
#[async_trait]
pub trait BallotCaster: Send + Sync {
    async fn cast(&self, request: &CastRequest) -> Result<CastReceipt>;
}

/// The collaborators a gate controller needs.
#[derive(Clone)]
pub struct GateServices {
    pub query: Arc<dyn VotePoolQuery>,
    pub signer: Arc<dyn SigningService>,
    pub seal: Arc<dyn SealService>,
}

impl GateServices {
    pub fn new(
        query: Arc<dyn VotePoolQuery>,
        signer: Arc<dyn SigningService>,
        seal: Arc<dyn SealService>,
    ) -> Self {
        Self {
            query,
            signer,
            seal,
        }
    }
}
