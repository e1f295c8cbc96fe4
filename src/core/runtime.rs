//! # Single-owner async runtime for an instrument.
//!
//! [`InstrumentRuntime`] moves an [`Instrument`] into its own task and serializes
//! every operation through a command queue. Timed continuations come back through
//! a second channel fed by a [`ChannelScheduler`], so waits never block callers.
//!
//! ```text
//! InstrumentHandle ──► [command queue] ──┐
//!                                        ├──► actor task ──► &mut Instrument
//! ChannelScheduler ──► [wake channel] ───┘         │
//!                                                  ▼
//!                                        Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - Commands run one at a time, in arrival order; a wake-up never interleaves with a command.
//! - Cancelling the runtime token stops the actor, cancels the pending continuation,
//!   and returns the final [`PersistedState`].
//! - Handle calls after shutdown return [`InstrumentError::Closed`].
//! - Subscribers only see events tagged with this instrument's id, even on a shared bus.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot};
use tokio::{select, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::instrument::{
    CaptureOutcome, DeploymentState, Instrument, InstrumentStatus, Resolution, TransferOutcome,
};
use crate::core::scheduler::ChannelScheduler;
use crate::core::InstrumentBuilder;
use crate::data::{DataRecord, Origin, PersistedState};
use crate::error::InstrumentError;
use crate::events::Event;
use crate::services::{Decision, ExternalId, ReviewDecision};
use crate::subscribers::{Subscribe, SubscriberSet};

const COMMAND_QUEUE: usize = 64;

type Job = Box<dyn FnOnce(&mut Instrument) + Send>;

/// Cloneable handle for operating a running instrument.
#[derive(Clone, Debug)]
pub struct InstrumentHandle {
    id: Arc<str>,
    tx: mpsc::Sender<Job>,
}

impl InstrumentHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Runs `f` on the instrument inside the actor and returns its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, InstrumentError>
    where
        F: FnOnce(&mut Instrument) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |instrument| {
            let _ = reply_tx.send(f(instrument));
        });
        self.tx
            .send(job)
            .await
            .map_err(|_| InstrumentError::Closed)?;
        reply_rx.await.map_err(|_| InstrumentError::Closed)
    }

    /// Operator toggle; refused while a sequence is in flight.
    pub async fn toggle(&self) -> Result<DeploymentState, InstrumentError> {
        self.call(|i| i.request_toggle()).await?
    }

    pub async fn capture(&self, silent: bool) -> Result<CaptureOutcome, InstrumentError> {
        self.call(move |i| i.capture(silent)).await?
    }

    pub async fn resolve_prompt(
        &self,
        id: u64,
        decision: Decision,
    ) -> Result<Resolution, InstrumentError> {
        self.call(move |i| i.resolve_prompt(id, decision)).await?
    }

    pub async fn review_committed(&self) -> Result<usize, InstrumentError> {
        self.call(|i| i.review_committed()).await
    }

    pub async fn review_provisional(&self) -> Result<bool, InstrumentError> {
        self.call(|i| i.review_provisional()).await
    }

    pub async fn decide(
        &self,
        origin: Origin,
        record: DataRecord,
        decision: ReviewDecision,
    ) -> Result<(), InstrumentError> {
        self.call(move |i| i.decide(origin, &record, decision))
            .await?
    }

    pub async fn restore(&self, record: DataRecord) -> Result<(), InstrumentError> {
        self.call(move |i| i.restore(record)).await
    }

    pub async fn reset_experiment(&self) -> Result<(), InstrumentError> {
        self.call(|i| i.reset_experiment()).await
    }

    pub async fn reset_external(&self) -> Result<(), InstrumentError> {
        self.call(|i| i.reset_external()).await
    }

    pub async fn clean_up_external(&self) -> Result<(), InstrumentError> {
        self.call(|i| i.clean_up_external()).await?
    }

    pub async fn collect_external(&self) -> Result<usize, InstrumentError> {
        self.call(|i| i.collect_external()).await?
    }

    pub async fn transfer_to(&self, target: ExternalId) -> Result<TransferOutcome, InstrumentError> {
        self.call(move |i| i.transfer_to(&target)).await?
    }

    pub async fn toggle_direct_mode(&self) -> Result<bool, InstrumentError> {
        self.call(|i| i.toggle_direct_mode()).await?
    }

    pub async fn data(&self) -> Result<Vec<DataRecord>, InstrumentError> {
        self.call(|i| i.data()).await
    }

    pub async fn record_count(&self) -> Result<usize, InstrumentError> {
        self.call(|i| i.record_count()).await
    }

    pub async fn status(&self) -> Result<InstrumentStatus, InstrumentError> {
        self.call(|i| i.status()).await
    }

    pub async fn snapshot(&self) -> Result<PersistedState, InstrumentError> {
        self.call(|i| i.snapshot()).await
    }
}

/// A running instrument: actor task, optional subscriber listener, and their token.
pub struct InstrumentRuntime {
    handle: InstrumentHandle,
    token: CancellationToken,
    actor: JoinHandle<PersistedState>,
    listener: Option<JoinHandle<()>>,
}

impl InstrumentRuntime {
    /// Spawns the instrument built by `builder`. Must be called within a tokio runtime.
    pub fn spawn(builder: InstrumentBuilder, token: CancellationToken) -> Self {
        Self::spawn_with(builder, Vec::new(), token)
    }

    /// Spawns the instrument and fans its events out to `subscribers`.
    pub fn spawn_with(
        mut builder: InstrumentBuilder,
        subscribers: Vec<Arc<dyn Subscribe>>,
        token: CancellationToken,
    ) -> Self {
        let id: Arc<str> = Arc::from(builder.id());
        let bus = builder.ensure_bus();

        let listener = (!subscribers.is_empty()).then(|| {
            let rx = bus.subscribe();
            let set = SubscriberSet::new(subscribers, bus.clone());
            tokio::spawn(subscriber_listener(id.clone(), rx, set, token.clone()))
        });

        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let instrument = builder
            .with_scheduler(ChannelScheduler::new(wake_tx))
            .build();
        let (tx, rx) = mpsc::channel::<Job>(COMMAND_QUEUE);
        let actor = tokio::spawn(actor_loop(instrument, rx, wake_rx, token.clone()));

        Self {
            handle: InstrumentHandle { id, tx },
            token,
            actor,
            listener,
        }
    }

    pub fn handle(&self) -> InstrumentHandle {
        self.handle.clone()
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    /// Stops the actor and returns the state to save.
    pub async fn shutdown(self) -> Result<PersistedState, InstrumentError> {
        self.token.cancel();
        let state = self.actor.await.map_err(|e| {
            warn!(instrument = %self.handle.id, error = %e, "instrument task failed");
            InstrumentError::Closed
        });
        if let Some(listener) = self.listener {
            let _ = listener.await;
        }
        state
    }
}

async fn actor_loop(
    mut instrument: Instrument,
    mut rx: mpsc::Receiver<Job>,
    mut wake_rx: mpsc::UnboundedReceiver<u64>,
    token: CancellationToken,
) -> PersistedState {
    loop {
        select! {
            _ = token.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job(&mut instrument),
                None => break,
            },
            Some(ticket) = wake_rx.recv() => {
                instrument.resume(ticket);
            }
        }
    }
    instrument.cancel_pending();
    debug!(instrument = instrument.id(), "instrument runtime stopped");
    instrument.snapshot()
}

async fn subscriber_listener(
    id: Arc<str>,
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    let ours = |ev: &Event| ev.instrument.as_deref() == Some(&*id);
    loop {
        select! {
            _ = token.cancelled() => break,
            ev = rx.recv() => match ev {
                Ok(ev) if ours(&ev) => set.emit(&ev),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(instrument = %id, skipped, "subscriber listener lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    while let Ok(ev) = rx.try_recv() {
        if ours(&ev) {
            set.emit(&ev);
        }
    }
    set.shutdown().await;
}
