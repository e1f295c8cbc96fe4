//! # LogWriter: events as `tracing` records.
//!
//! Routes every instrument event to `tracing` at a level matching its weight:
//! notices and state arrivals at `info`, sequence plumbing at `debug`, subscriber
//! trouble at `warn`. Install any `tracing` subscriber to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO samplebay: [deployed] instrument="bay-1"
//! INFO samplebay: [notice] instrument="bay-1" text="[Goo]: 4 data from Sample 1"
//! WARN samplebay: [subscriber-overflow] subscriber="hud" reason="full"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let who = e.instrument.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::DeployStarted | EventKind::RetractStarted => {
                debug!(instrument = who, delay_ms = ?e.delay_ms, "[{}]", label(e.kind));
            }
            EventKind::SequenceCancelled => {
                debug!(instrument = who, step = ?e.reason, "[sequence-cancelled]");
            }
            EventKind::Deployed | EventKind::Retracted => {
                info!(instrument = who, "[{}]", label(e.kind));
            }
            EventKind::CaptureCompleted
            | EventKind::RecordCommitted
            | EventKind::RecordDiscarded
            | EventKind::RecordDisposed
            | EventKind::RecordRestored => {
                info!(instrument = who, slot = ?e.slot, subject = ?e.subject, "[{}]", label(e.kind));
            }
            EventKind::ExperimentReset | EventKind::ExternalReset => {
                info!(instrument = who, "[{}]", label(e.kind));
            }
            EventKind::NoticePosted => {
                if let Some(notice) = &e.notice {
                    info!(instrument = who, text = %notice, "[notice]");
                }
            }
            EventKind::PromptOpened | EventKind::PromptResolved => {
                debug!(instrument = who, prompt = ?e.prompt, answer = ?e.reason, "[{}]", label(e.kind));
            }
            EventKind::InstrumentRegistered | EventKind::InstrumentRemoved => {
                info!(instrument = who, "[{}]", label(e.kind));
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(subscriber = who, reason = ?e.reason, "[{}]", label(e.kind));
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

fn label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::DeployStarted => "deploy-started",
        EventKind::Deployed => "deployed",
        EventKind::RetractStarted => "retract-started",
        EventKind::Retracted => "retracted",
        EventKind::SequenceCancelled => "sequence-cancelled",
        EventKind::CaptureCompleted => "capture",
        EventKind::RecordCommitted => "committed",
        EventKind::RecordDiscarded => "discarded",
        EventKind::RecordDisposed => "disposed",
        EventKind::RecordRestored => "restored",
        EventKind::ExperimentReset => "experiment-reset",
        EventKind::ExternalReset => "external-reset",
        EventKind::NoticePosted => "notice",
        EventKind::PromptOpened => "prompt-opened",
        EventKind::PromptResolved => "prompt-resolved",
        EventKind::InstrumentRegistered => "registered",
        EventKind::InstrumentRemoved => "removed",
        EventKind::SubscriberOverflow => "subscriber-overflow",
        EventKind::SubscriberPanicked => "subscriber-panicked",
    }
}
