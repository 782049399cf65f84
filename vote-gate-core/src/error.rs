use thiserror::Error;

use crate::types::PoolId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("vote pool not found: {0}")]
    NotFound(PoolId),

    #[error("vote pool fetch failed: {0}")]
    Fetch(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("stale result ignored (issued at epoch {issued}, current epoch {current})")]
    StaleResult { issued: u64, current: u64 },

    #[error("a signing request is already pending")]
    SigningInProgress,

    #[error("signing is only available while gated content is locked")]
    NotLocked,

    #[error("no wallet account connected")]
    NoAccount,

    #[error("no valid session credential for the connected account")]
    NoValidCredential,

    #[error("invalid vote details: {0}")]
    InvalidDetails(String),

    #[error("choice {choice} is out of range ({options} option(s))")]
    InvalidChoice { choice: usize, options: usize },

    #[error("vote submission failed: {0}")]
    Cast(String),

    #[error("transport: {0}")]
    Transport(String),
}

impl GateError {
    /// Errors the user can act on by retrying the same action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Signing(_) | Self::Decryption(_) | Self::Cast(_) | Self::Transport(_)
        )
    }

    /// Stale and duplicate-request drops are bookkeeping, never shown.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            Self::StaleResult { .. } | Self::SigningInProgress | Self::NotLocked
        )
    }
}
