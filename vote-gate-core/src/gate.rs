//! Access Gate
//!
//! The gate decides what a vote page may show: public content, gated content
//! that is still locked behind a signature, or gated content that a valid
//! session credential has unlocked.
//!
//! ## Structure
//!
//! - **GateModel**: the state container owned by the page controller
//! - **GateEvent**: what happened (user intent or a background completion)
//! - **GateCommand**: IO the model wants performed, queued by `handle_event`
//! - **TaskStatus**: lifecycle of each kind of background work
//!
//! The phase is derived on demand by [`GateModel::phase`] and never stored,
//! so credential expiry and account switches take effect without an explicit
//! transition.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::casting::CastingView;
use crate::credential::{is_credential_valid, SessionCredential, SessionKeyRequest};
use crate::error::GateError;
use crate::events::{DecryptKey, GateCommand, GateEvent, RequestContext};
use crate::types::{Address, BallotContent, DecryptedContent, PoolId, VotePoolRecord};

// =============================================================================
// BACKGROUND TASKS - TaskStatus pattern
// =============================================================================

/// Status of a background task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus<T, E> {
    /// No task running
    Idle,
    /// Task is in progress
    InProgress,
    /// Task completed with result
    Finished(Result<T, E>),
}

impl<T, E> Default for TaskStatus<T, E> {
    fn default() -> Self {
        TaskStatus::Idle
    }
}

impl<T, E> TaskStatus<T, E> {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    /// The error, if the task finished with one.
    pub fn error(&self) -> Option<&E> {
        match self {
            TaskStatus::Finished(Err(e)) => Some(e),
            _ => None,
        }
    }
}

/// Background work tracked by the gate.
#[derive(Debug, Default)]
pub struct GateTasks {
    pub fetch: TaskStatus<(), GateError>,
    /// At most one signing request may be in progress.
    pub signing: TaskStatus<(), GateError>,
    pub decrypt: TaskStatus<(), GateError>,
}

// =============================================================================
// PHASE / OUTCOME
// =============================================================================

/// Which view state applies right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// Record not loaded yet.
    Unresolved,
    /// Public pool; content goes straight to casting.
    PublicView,
    /// Gated pool without a valid credential.
    GatedLocked,
    /// Gated pool with a valid credential.
    GatedUnlocked,
    /// Fetch failed or returned nothing. Absorbing.
    NotFound,
}

/// What `handle_event` did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Applied,
    /// The event left the state untouched, for the given reason.
    Dropped(GateError),
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied)
    }

    pub fn dropped_reason(&self) -> Option<&GateError> {
        match self {
            EventOutcome::Dropped(e) => Some(e),
            EventOutcome::Applied => None,
        }
    }
}

/// Values the gate needs to mint session key requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    pub package_id: String,
    pub session_ttl: Duration,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            package_id: "0x0".to_string(),
            session_ttl: Duration::minutes(crate::credential::DEFAULT_SESSION_TTL_MINUTES),
        }
    }
}

// =============================================================================
// GATE MODEL
// =============================================================================

/// State container for one vote page.
#[derive(Debug)]
pub struct GateModel {
    settings: GateSettings,
    pool_id: PoolId,
    account: Option<Address>,
    epoch: u64,

    // Server data
    record: Option<VotePoolRecord>,
    not_found: bool,
    public_content: Option<Result<BallotContent, GateError>>,

    // Session data (memory only, cleared on account change)
    credential: Option<SessionCredential>,
    decrypted: Option<DecryptedContent>,
    /// Key of the decryption in flight or already attached.
    decrypt_key: Option<DecryptKey>,

    pub tasks: GateTasks,

    /// Commands to execute (populated by handle_event, consumed by take_commands)
    pending_commands: Vec<GateCommand>,
}

impl GateModel {
    pub fn new(pool_id: PoolId, account: Option<Address>, settings: GateSettings) -> Self {
        Self {
            settings,
            pool_id,
            account,
            epoch: 0,
            record: None,
            not_found: false,
            public_content: None,
            credential: None,
            decrypted: None,
            decrypt_key: None,
            tasks: GateTasks::default(),
            pending_commands: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn pool_id(&self) -> &PoolId {
        &self.pool_id
    }

    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn record(&self) -> Option<&VotePoolRecord> {
        self.record.as_ref()
    }

    pub fn credential(&self) -> Option<&SessionCredential> {
        self.credential.as_ref()
    }

    pub fn decrypted(&self) -> Option<&DecryptedContent> {
        self.decrypted.as_ref()
    }

    pub fn public_content(&self) -> Option<&Result<BallotContent, GateError>> {
        self.public_content.as_ref()
    }

    pub fn pending_commands(&self) -> &[GateCommand] {
        &self.pending_commands
    }

    /// Drain queued commands for execution.
    pub fn take_commands(&mut self) -> Vec<GateCommand> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Context that requests issued now are tagged with.
    pub fn context(&self) -> RequestContext {
        RequestContext {
            epoch: self.epoch,
            account: self.account.clone(),
            pool_id: self.pool_id.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Derived state
    // -------------------------------------------------------------------------

    pub fn has_valid_credential(&self, now: DateTime<Utc>) -> bool {
        is_credential_valid(self.credential.as_ref(), self.account.as_ref(), now)
    }

    pub fn phase(&self, now: DateTime<Utc>) -> GatePhase {
        if self.not_found {
            return GatePhase::NotFound;
        }
        match &self.record {
            None => GatePhase::Unresolved,
            Some(record) if !record.is_gated() => GatePhase::PublicView,
            Some(_) if self.has_valid_credential(now) => GatePhase::GatedUnlocked,
            Some(_) => GatePhase::GatedLocked,
        }
    }

    /// Content for the casting sub-view, if the current phase exposes any.
    pub fn casting(&self, now: DateTime<Utc>) -> Option<CastingView<'_>> {
        let record = self.record.as_ref()?;
        let content = match self.phase(now) {
            GatePhase::PublicView => self.public_content.as_ref()?.as_ref().ok()?,
            GatePhase::GatedUnlocked => {
                let decrypted = self.decrypted.as_ref()?;
                let credential = self.credential.as_ref()?;
                if decrypted.credential_id != credential.id {
                    return None;
                }
                &decrypted.content
            }
            _ => return None,
        };
        Some(CastingView {
            pool_id: &record.id,
            ballot_box_id: &record.ballot_box_id,
            content,
        })
    }

    /// Most recent user-visible error for the current phase.
    pub fn last_error(&self, now: DateTime<Utc>) -> Option<&GateError> {
        match self.phase(now) {
            GatePhase::NotFound => self.tasks.fetch.error(),
            GatePhase::PublicView => self.public_content.as_ref()?.as_ref().err(),
            GatePhase::GatedLocked => self.tasks.signing.error(),
            GatePhase::GatedUnlocked => self.tasks.decrypt.error(),
            GatePhase::Unresolved => None,
        }
    }

    // -------------------------------------------------------------------------
    // Event handling
    // -------------------------------------------------------------------------

    /// Apply one event. Resulting IO is queued in `pending_commands`.
    pub fn handle_event(&mut self, event: GateEvent, now: DateTime<Utc>) -> EventOutcome {
        debug!(
            pool_id = %self.pool_id,
            epoch = self.epoch,
            issued = ?event.context().map(|ctx| ctx.epoch),
            event = event.kind(),
            "gate event"
        );

        let before = self.phase(now);
        let outcome = match event {
            GateEvent::Mounted => self.on_mounted(),
            GateEvent::AccountChanged(account) => self.on_account_changed(account),
            GateEvent::SignRequested => self.on_sign_requested(now),
            GateEvent::DecryptRequested => self.on_decrypt_requested(now),
            GateEvent::FetchCompleted { ctx, result } => self.on_fetch_completed(ctx, result),
            GateEvent::SignCompleted { ctx, result } => self.on_sign_completed(ctx, result, now),
            GateEvent::DecryptCompleted { ctx, key, result } => {
                self.on_decrypt_completed(ctx, key, result)
            }
        };

        match &outcome {
            EventOutcome::Applied => {
                let after = self.phase(now);
                if after != before {
                    info!(
                        pool_id = %self.pool_id,
                        epoch = self.epoch,
                        from = ?before,
                        to = ?after,
                        "gate phase changed"
                    );
                }
            }
            EventOutcome::Dropped(reason) => {
                debug!(pool_id = %self.pool_id, epoch = self.epoch, %reason, "event dropped");
            }
        }
        outcome
    }

    fn on_mounted(&mut self) -> EventOutcome {
        if self.not_found {
            return EventOutcome::Dropped(GateError::NotFound(self.pool_id.clone()));
        }
        if self.record.is_none() && !self.tasks.fetch.is_in_progress() {
            self.queue_fetch();
        }
        EventOutcome::Applied
    }

    fn on_account_changed(&mut self, account: Option<Address>) -> EventOutcome {
        self.epoch += 1;
        self.account = account;

        if self.not_found {
            // NotFound survives account switches; nothing to refetch.
            return EventOutcome::Applied;
        }

        // Reset first, then refetch under the new context.
        self.record = None;
        self.public_content = None;
        self.credential = None;
        self.decrypted = None;
        self.decrypt_key = None;
        self.tasks = GateTasks::default();
        self.pending_commands.clear();
        self.queue_fetch();
        EventOutcome::Applied
    }

    fn on_sign_requested(&mut self, now: DateTime<Utc>) -> EventOutcome {
        if self.not_found {
            return EventOutcome::Dropped(GateError::NotFound(self.pool_id.clone()));
        }
        let Some(address) = self.account.clone() else {
            return EventOutcome::Dropped(GateError::NoAccount);
        };
        if self.tasks.signing.is_in_progress() {
            return EventOutcome::Dropped(GateError::SigningInProgress);
        }
        if self.phase(now) != GatePhase::GatedLocked {
            return EventOutcome::Dropped(GateError::NotLocked);
        }

        let request = SessionKeyRequest::new(
            address,
            self.settings.package_id.clone(),
            self.settings.session_ttl,
            now,
        );
        self.tasks.signing = TaskStatus::InProgress;
        self.pending_commands.push(GateCommand::Sign {
            ctx: self.context(),
            request,
        });
        EventOutcome::Applied
    }

    fn on_decrypt_requested(&mut self, now: DateTime<Utc>) -> EventOutcome {
        if self.not_found {
            return EventOutcome::Dropped(GateError::NotFound(self.pool_id.clone()));
        }
        match self.queue_decrypt(now) {
            Ok(()) => EventOutcome::Applied,
            Err(e) => EventOutcome::Dropped(e),
        }
    }

    fn on_fetch_completed(
        &mut self,
        ctx: RequestContext,
        result: Result<Option<VotePoolRecord>, GateError>,
    ) -> EventOutcome {
        if let Err(stale) = self.ensure_current(&ctx) {
            return EventOutcome::Dropped(stale);
        }

        match result {
            Ok(Some(record)) => {
                if !record.is_gated() {
                    let parsed = record.parse_public_details();
                    if let Err(e) = &parsed {
                        warn!(pool_id = %record.id, error = %e, "public details unreadable");
                    }
                    self.public_content = Some(parsed);
                }
                self.record = Some(record);
                self.tasks.fetch = TaskStatus::Finished(Ok(()));
            }
            Ok(None) => {
                self.not_found = true;
                self.tasks.fetch =
                    TaskStatus::Finished(Err(GateError::NotFound(self.pool_id.clone())));
            }
            Err(e) => {
                warn!(pool_id = %self.pool_id, error = %e, "vote pool fetch failed");
                self.not_found = true;
                self.tasks.fetch = TaskStatus::Finished(Err(e));
            }
        }
        EventOutcome::Applied
    }

    fn on_sign_completed(
        &mut self,
        ctx: RequestContext,
        result: Result<SessionCredential, GateError>,
        now: DateTime<Utc>,
    ) -> EventOutcome {
        if let Err(stale) = self.ensure_current(&ctx) {
            return EventOutcome::Dropped(stale);
        }

        let credential = match result {
            Ok(credential) if Some(&credential.address) != self.account.as_ref() => {
                Err(GateError::Signing(format!(
                    "credential issued for {} instead of the connected account",
                    credential.address
                )))
            }
            Ok(credential) if credential.is_expired(now) => Err(GateError::Signing(format!(
                "credential already expired at {}",
                credential.expires_at
            ))),
            other => other,
        };

        match credential {
            Ok(credential) => {
                self.tasks.signing = TaskStatus::Finished(Ok(()));
                self.credential = Some(credential);
                // A new credential starts a new decryption.
                self.decrypted = None;
                self.decrypt_key = None;
                self.tasks.decrypt = TaskStatus::Idle;
                if let Err(e) = self.queue_decrypt(now) {
                    debug!(pool_id = %self.pool_id, reason = %e, "decryption not started");
                }
            }
            Err(e) => {
                warn!(pool_id = %self.pool_id, error = %e, "signing failed");
                self.tasks.signing = TaskStatus::Finished(Err(e));
            }
        }
        EventOutcome::Applied
    }

    fn on_decrypt_completed(
        &mut self,
        ctx: RequestContext,
        key: DecryptKey,
        result: Result<DecryptedContent, GateError>,
    ) -> EventOutcome {
        if let Err(stale) = self.ensure_current(&ctx) {
            return EventOutcome::Dropped(stale);
        }
        if self.decrypt_key.as_ref() != Some(&key) {
            // Superseded by a newer credential.
            return EventOutcome::Dropped(GateError::StaleResult {
                issued: ctx.epoch,
                current: self.epoch,
            });
        }

        match result {
            Ok(content) => {
                self.decrypted = Some(content);
                self.tasks.decrypt = TaskStatus::Finished(Ok(()));
            }
            Err(e) => {
                warn!(pool_id = %self.pool_id, error = %e, "decryption failed");
                self.tasks.decrypt = TaskStatus::Finished(Err(e));
            }
        }
        EventOutcome::Applied
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn ensure_current(&self, ctx: &RequestContext) -> Result<(), GateError> {
        let current = self.context();
        if *ctx == current {
            Ok(())
        } else {
            Err(GateError::StaleResult {
                issued: ctx.epoch,
                current: current.epoch,
            })
        }
    }

    fn queue_fetch(&mut self) {
        self.tasks.fetch = TaskStatus::InProgress;
        self.pending_commands.push(GateCommand::FetchPool {
            ctx: self.context(),
            pool_id: self.pool_id.clone(),
        });
    }

    fn queue_decrypt(&mut self, now: DateTime<Utc>) -> Result<(), GateError> {
        if self.phase(now) != GatePhase::GatedUnlocked {
            return Err(GateError::NoValidCredential);
        }
        let (Some(credential), Some(record)) = (&self.credential, &self.record) else {
            return Err(GateError::NoValidCredential);
        };

        let key = DecryptKey {
            credential_id: credential.id,
            pool_id: record.id.clone(),
        };
        if self.decrypt_key.as_ref() == Some(&key)
            && (self.tasks.decrypt.is_in_progress() || self.decrypted.is_some())
        {
            // Already requested for this credential and pool.
            return Ok(());
        }

        let command = GateCommand::Decrypt {
            ctx: self.context(),
            key: key.clone(),
            credential: credential.clone(),
            record: record.clone(),
        };
        self.decrypt_key = Some(key);
        self.tasks.decrypt = TaskStatus::InProgress;
        self.pending_commands.push(command);
        Ok(())
    }
}

/// `(state, event) -> state` form of [`GateModel::handle_event`].
pub fn reduce(mut model: GateModel, event: GateEvent, now: DateTime<Utc>) -> GateModel {
    model.handle_event(event, now);
    model
}
