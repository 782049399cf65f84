use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::GateError;

// ─── Identifiers ──────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// On-chain object id of a vote pool.
    PoolId
);
string_id!(
    /// On-chain object id of the ballot box that records casts for a pool.
    BallotBoxId
);
string_id!(
    /// Wallet account address. Compared by exact string equality.
    Address
);

// ─── Vote pool ────────────────────────────────────────────────

/// Who may read a pool's details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Details are plain JSON, readable by anyone.
    Public,
    /// Details are sealed; reading them needs a session credential.
    Gated,
}

/// A vote pool as returned by the query service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VotePoolRecord {
    pub id: PoolId,
    pub title: String,
    /// Voting deadline (epoch milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    pub visibility: Visibility,
    pub ballot_box_id: BallotBoxId,
    /// JSON-encoded [`BallotContent`] when public, a ciphertext reference when gated.
    pub details: String,
}

impl VotePoolRecord {
    pub fn is_gated(&self) -> bool {
        self.visibility == Visibility::Gated
    }

    /// Parse the details of a public pool into ballot content.
    pub fn parse_public_details(&self) -> Result<BallotContent, GateError> {
        if self.is_gated() {
            return Err(GateError::InvalidDetails(format!(
                "pool {} is gated; its details are sealed",
                self.id
            )));
        }
        BallotContent::from_json(&self.details)
    }
}

// ─── Ballot content ───────────────────────────────────────────

/// Structured content handed to the casting sub-view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotContent {
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BallotContent {
    pub fn from_json(raw: &str) -> Result<Self, GateError> {
        let content: BallotContent =
            serde_json::from_str(raw).map_err(|e| GateError::InvalidDetails(e.to_string()))?;
        if content.options.is_empty() {
            return Err(GateError::InvalidDetails("no options".to_string()));
        }
        Ok(content)
    }
}

/// Plaintext of a gated pool's details. Memory only; never serialized.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedContent {
    pub pool_id: PoolId,
    /// Credential the content was decrypted with.
    pub credential_id: Uuid,
    pub content: BallotContent,
}
