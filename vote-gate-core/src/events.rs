//! Gate events and commands
//!
//! Events are everything that can happen to the gate: user intent and
//! completions of background work. Commands are the IO the gate asks its
//! controller to perform. Every command carries the [`RequestContext`] it was
//! issued under, and its completion event echoes it back so stale results
//! can be recognised.

use uuid::Uuid;

use crate::credential::{SessionCredential, SessionKeyRequest};
use crate::error::GateError;
use crate::types::{Address, DecryptedContent, PoolId, VotePoolRecord};

/// Identity of the page context a request was issued for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// Bumped on every account change.
    pub epoch: u64,
    pub account: Option<Address>,
    pub pool_id: PoolId,
}

/// Idempotency key for decryption: one decryption per credential and pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecryptKey {
    pub credential_id: Uuid,
    pub pool_id: PoolId,
}

// =============================================================================
// GATE EVENT
// =============================================================================

#[derive(Debug)]
pub enum GateEvent {
    // -------------------------------------------------------------------------
    // Lifecycle / user intent
    // -------------------------------------------------------------------------
    /// Page opened; issue the first fetch.
    Mounted,

    /// Wallet switched account (or disconnected with `None`).
    AccountChanged(Option<Address>),

    /// User pressed the sign button.
    SignRequested,

    /// User asked to (re)try decrypting gated details.
    DecryptRequested,

    // -------------------------------------------------------------------------
    // Completions
    // -------------------------------------------------------------------------
    FetchCompleted {
        ctx: RequestContext,
        result: Result<Option<VotePoolRecord>, GateError>,
    },

    SignCompleted {
        ctx: RequestContext,
        result: Result<SessionCredential, GateError>,
    },

    DecryptCompleted {
        ctx: RequestContext,
        key: DecryptKey,
        result: Result<DecryptedContent, GateError>,
    },
}

impl GateEvent {
    /// Completion events carry the context they were issued under.
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            GateEvent::FetchCompleted { ctx, .. }
            | GateEvent::SignCompleted { ctx, .. }
            | GateEvent::DecryptCompleted { ctx, .. } => Some(ctx),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GateEvent::Mounted => "mounted",
            GateEvent::AccountChanged(_) => "account_changed",
            GateEvent::SignRequested => "sign_requested",
            GateEvent::DecryptRequested => "decrypt_requested",
            GateEvent::FetchCompleted { .. } => "fetch_completed",
            GateEvent::SignCompleted { .. } => "sign_completed",
            GateEvent::DecryptCompleted { .. } => "decrypt_completed",
        }
    }
}

// =============================================================================
// GATE COMMAND
// =============================================================================

/// IO requested by the gate. Executed by the controller, never by the model.
#[derive(Clone, Debug, PartialEq)]
pub enum GateCommand {
    FetchPool {
        ctx: RequestContext,
        pool_id: PoolId,
    },

    Sign {
        ctx: RequestContext,
        request: SessionKeyRequest,
    },

    Decrypt {
        ctx: RequestContext,
        key: DecryptKey,
        credential: SessionCredential,
        record: VotePoolRecord,
    },
}

impl GateCommand {
    pub fn context(&self) -> &RequestContext {
        match self {
            GateCommand::FetchPool { ctx, .. }
            | GateCommand::Sign { ctx, .. }
            | GateCommand::Decrypt { ctx, .. } => ctx,
        }
    }
}
