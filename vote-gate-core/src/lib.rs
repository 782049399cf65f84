//! vote-gate: access control for vote pool pages
//!
//! A vote pool is either public (details readable by anyone) or gated
//! (details sealed; reading them takes a short-lived session credential the
//! wallet signs). The gate tracks which of those views applies for the
//! connected account and drives the fetch / sign / decrypt collaborators.
//!
//! ```text
//!   account / user events ──► GateController ──► GateModel::handle_event
//!                                   │                   │
//!                                   │◄── GateCommand ───┘
//!                                   ▼
//!            VotePoolQuery · SigningService · SealService   (spawned)
//!                                   │
//!                                   └── completion GateEvent ──► model
//! ```
//!
//! Completions are tagged with the context they were issued under; anything
//! arriving after an account switch is dropped.

pub mod casting;
pub mod clock;
pub mod config;
pub mod controller;
pub mod credential;
pub mod error;
pub mod events;
pub mod gate;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod ports;
pub mod signer;
pub mod types;
pub mod view;

pub use casting::{CastReceipt, CastRequest, CastingView};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use controller::GateController;
pub use credential::{is_credential_valid, SessionCredential, SessionKeyRequest};
pub use error::GateError;
pub use events::{DecryptKey, GateCommand, GateEvent, RequestContext};
pub use gate::{reduce, EventOutcome, GateModel, GatePhase, GateSettings, TaskStatus};
#[cfg(feature = "http")]
pub use http::HttpVotePoolQuery;
pub use memory::{Fixture, MemoryBallotCaster, MemorySealService, MemoryVotePoolQuery};
pub use ports::{BallotCaster, GateServices, SealService, SigningService, VotePoolQuery};
pub use signer::{LocalWallet, PersonalMessageWallet, WalletSessionSigner};
pub use types::{
    Address, BallotBoxId, BallotContent, DecryptedContent, PoolId, Visibility, VotePoolRecord,
};
pub use view::{GateView, PoolHeader, PoolStatus};
