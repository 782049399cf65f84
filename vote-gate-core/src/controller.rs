//! Page controller: owns the gate model and runs its commands.
//!
//! Commands are spawned as tasks; each reports back as a completion event on
//! a channel, and the controller applies completions one at a time. The model
//! is never touched from inside a task, so no locking is involved and a
//! completion that arrives after its context moved on is simply dropped by
//! the model. A command whose task dies still reports back, as a failure of
//! that command.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

use crate::casting::CastReceipt;
use crate::clock::Clock;
use crate::error::GateError;
use crate::events::{GateCommand, GateEvent};
use crate::gate::{EventOutcome, GateModel, GatePhase, GateSettings};
use crate::ports::{BallotCaster, GateServices};
use crate::types::{Address, PoolId};
use crate::view::GateView;

pub struct GateController {
    model: GateModel,
    services: GateServices,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<GateEvent>,
    rx: mpsc::UnboundedReceiver<GateEvent>,
    /// Spawned commands whose completion has not been applied yet.
    in_flight: usize,
}

impl GateController {
    pub fn new(
        pool_id: PoolId,
        account: Option<Address>,
        settings: GateSettings,
        services: GateServices,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            model: GateModel::new(pool_id, account, settings),
            services,
            clock,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn model(&self) -> &GateModel {
        &self.model
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn phase(&self) -> GatePhase {
        self.model.phase(self.now())
    }

    pub fn view(&self) -> GateView {
        GateView::project(&self.model, self.now())
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // -------------------------------------------------------------------------
    // Event subscriptions
    // -------------------------------------------------------------------------

    pub fn mount(&mut self) -> EventOutcome {
        self.dispatch(GateEvent::Mounted)
    }

    pub fn on_account_change(&mut self, account: Option<Address>) -> EventOutcome {
        self.dispatch(GateEvent::AccountChanged(account))
    }

    pub fn request_signing(&mut self) -> EventOutcome {
        self.dispatch(GateEvent::SignRequested)
    }

    pub fn request_decrypt(&mut self) -> EventOutcome {
        self.dispatch(GateEvent::DecryptRequested)
    }

    /// Apply an event and start whatever commands it queued.
    pub fn dispatch(&mut self, event: GateEvent) -> EventOutcome {
        let now = self.clock.now();
        let outcome = self.model.handle_event(event, now);
        self.execute_commands();
        outcome
    }

    /// Wait for the next completion and apply it. `None` once nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<EventOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        // `self.tx` keeps the channel open, so `recv` only ends with an event.
        let event = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(self.dispatch(event))
    }

    /// Apply completions until no command is left in flight.
    pub async fn run_until_idle(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_completion().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Submit a vote for option `choice` of the content currently exposed.
    pub async fn cast(
        &self,
        caster: &dyn BallotCaster,
        choice: usize,
    ) -> Result<CastReceipt, GateError> {
        let now = self.clock.now();
        let Some(casting) = self.model.casting(now) else {
            return Err(match self.model.phase(now) {
                GatePhase::NotFound => GateError::NotFound(self.model.pool_id().clone()),
                GatePhase::PublicView => self
                    .model
                    .last_error(now)
                    .cloned()
                    .unwrap_or_else(|| GateError::InvalidDetails("no content".to_string())),
                _ => GateError::NoValidCredential,
            });
        };
        let request = casting.request(choice)?;
        debug!(pool_id = %request.pool_id, choice, "casting vote");
        caster.cast(&request).await
    }

    fn execute_commands(&mut self) {
        for command in self.model.take_commands() {
            let span = tracing::info_span!(
                "gate_command",
                command = command_name(&command),
                epoch = command.context().epoch,
            );
            let services = self.services.clone();
            let tx = self.tx.clone();
            let pending = command.clone();
            self.in_flight += 1;
            let task = tokio::spawn(
                async move { run_command(&services, command).await }.instrument(span.clone()),
            );
            tokio::spawn(
                async move {
                    let event = match task.await {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(error = %e, "gate command aborted");
                            aborted(pending, e.to_string())
                        }
                    };
                    if tx.send(event).is_err() {
                        debug!("controller gone; completion discarded");
                    }
                }
                .instrument(span),
            );
        }
    }
}

fn command_name(command: &GateCommand) -> &'static str {
    match command {
        GateCommand::FetchPool { .. } => "fetch_pool",
        GateCommand::Sign { .. } => "sign",
        GateCommand::Decrypt { .. } => "decrypt",
    }
}

/// Completion standing in for a command whose task never answered.
fn aborted(command: GateCommand, reason: String) -> GateEvent {
    match command {
        GateCommand::FetchPool { ctx, .. } => GateEvent::FetchCompleted {
            ctx,
            result: Err(GateError::Fetch(reason)),
        },
        GateCommand::Sign { ctx, .. } => GateEvent::SignCompleted {
            ctx,
            result: Err(GateError::Signing(reason)),
        },
        GateCommand::Decrypt { ctx, key, .. } => GateEvent::DecryptCompleted {
            ctx,
            key,
            result: Err(GateError::Decryption(reason)),
        },
    }
}

async fn run_command(services: &GateServices, command: GateCommand) -> GateEvent {
    match command {
        GateCommand::FetchPool { ctx, pool_id } => {
            let result = services.query.fetch_pool(&pool_id).await;
            GateEvent::FetchCompleted { ctx, result }
        }
        GateCommand::Sign { ctx, request } => {
            let result = services.signer.sign(&request).await;
            GateEvent::SignCompleted { ctx, result }
        }
        GateCommand::Decrypt {
            ctx,
            key,
            credential,
            record,
        } => {
            let result = services.seal.decrypt(&credential, &record).await;
            GateEvent::DecryptCompleted { ctx, key, result }
        }
    }
}
