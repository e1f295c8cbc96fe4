//! # Timed continuations.
//!
//! Deploy and retract sequences are chains of "play a clip, wait for its length,
//! continue". The instrument keeps the continuation itself and hands a [`Scheduler`]
//! only a ticket, a delay and a [`CancellationToken`]; when the delay elapses the
//! scheduler's owner calls `Instrument::resume(ticket)`.
//!
//! ## Rules
//! - At most one ticket is live per instrument; scheduling a new one cancels the old token.
//! - `resume` with a stale or cancelled ticket is ignored, so a continuation never fires twice.
//! - Zero delays never reach the scheduler; the instrument runs the step inline.
//!
//! ## Implementations
//! - [`ChannelScheduler`]: tokio timer, posts due tickets into a channel drained by the runtime actor.
//! - [`ManualScheduler`]: records requests; the host (game loop, tests) decides when to resume.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::{select, sync::mpsc, time};
use tokio_util::sync::CancellationToken;

/// Arranges for a ticket to come back after a delay.
pub trait Scheduler: Send {
    /// Schedules `ticket` to be resumed after `after`, unless `token` is cancelled first.
    fn schedule(&mut self, ticket: u64, after: Duration, token: CancellationToken);
}

/// Tokio-backed scheduler feeding an actor's wake-up channel.
///
/// Must be used from within a tokio runtime.
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<u64>,
}

impl ChannelScheduler {
    pub fn new(tx: mpsc::UnboundedSender<u64>) -> Self {
        Self { tx }
    }
}

impl Scheduler for ChannelScheduler {
    fn schedule(&mut self, ticket: u64, after: Duration, token: CancellationToken) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let sleep = time::sleep(after);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {
                    let _ = tx.send(ticket);
                }
                _ = token.cancelled() => {}
            }
        });
    }
}

/// One request recorded by [`ManualScheduler`].
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub ticket: u64,
    pub after: Duration,
    pub token: CancellationToken,
}

/// Scheduler that only records requests.
///
/// Clones share the same record, so a host can keep one clone and hand the other
/// to the instrument.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    requests: Arc<Mutex<Vec<Scheduled>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<Scheduled> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Requests whose token is still live.
    pub fn live(&self) -> Vec<Scheduled> {
        self.requests()
            .into_iter()
            .filter(|s| !s.token.is_cancelled())
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, ticket: u64, after: Duration, token: CancellationToken) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(Scheduled {
                ticket,
                after,
                token,
            });
        }
    }
}
