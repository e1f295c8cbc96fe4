//! # Instrument events.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Sequence events**: deploy/retract choreography (started, finished, cancelled)
//! - **Record events**: capture and lifecycle transitions of data records
//! - **Operator events**: user-visible notices and confirmation prompts
//! - **Runtime events**: registry membership and subscriber health
//!
//! The [`Event`] struct carries metadata such as timestamps, instrument id,
//! slot index, and the typed [`Notice`] for user-visible messages.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use samplebay::{Event, EventKind, Notice};
//!
//! let ev = Event::new(EventKind::NoticePosted)
//!     .with_instrument("bay-1")
//!     .with_notice(Notice::TransmitNoNetwork);
//!
//! assert_eq!(ev.kind, EventKind::NoticePosted);
//! assert_eq!(ev.instrument.as_deref(), Some("bay-1"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of instrument events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Sequence events ===
    /// Deploy sequence started.
    ///
    /// Sets:
    /// - `delay_ms`: time until the next continuation (omitted in direct mode)
    DeployStarted,

    /// Instrument reached the deployed pose.
    Deployed,

    /// Retract sequence started.
    ///
    /// Sets:
    /// - `delay_ms`: time until the next continuation (omitted in direct mode)
    RetractStarted,

    /// Instrument reached the retracted pose.
    Retracted,

    /// A pending continuation was cancelled before it fired.
    ///
    /// Sets:
    /// - `reason`: name of the cancelled step
    SequenceCancelled,

    // === Record events ===
    /// A record was produced by the capture step.
    ///
    /// Sets:
    /// - `subject`: subject id of the record
    /// - `slot`: slot occupied (absent on overwrite)
    CaptureCompleted,

    /// A provisional record was committed.
    RecordCommitted,

    /// A record was discarded; its slot is free again.
    RecordDiscarded,

    /// A record left the instrument and used up its slot.
    RecordDisposed,

    /// A record came back from outside.
    RecordRestored,

    /// Experiment reset cleared all records.
    ExperimentReset,

    /// External repair reset the whole instrument.
    ExternalReset,

    // === Operator events ===
    /// A user-visible message.
    ///
    /// Sets:
    /// - `notice`: typed message payload
    NoticePosted,

    /// A confirmation prompt was opened.
    ///
    /// Sets:
    /// - `prompt`: prompt id
    /// - `notice`: the question being asked
    PromptOpened,

    /// A confirmation prompt was answered.
    ///
    /// Sets:
    /// - `prompt`: prompt id
    /// - `reason`: "confirm" or "cancel"
    PromptResolved,

    // === Runtime events ===
    /// An instrument joined the registry.
    InstrumentRegistered,

    /// An instrument left the registry.
    InstrumentRemoved,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `instrument`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `instrument`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

/// User-visible messages, parameterized but not localized.
///
/// `Display` renders a plain English fallback; hosts that localize match on the
/// variant instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Inoperable { title: Arc<str> },
    Ineligible { title: Arc<str> },
    UsageRequirementUnmet { message: String },
    /// Question asked by the overwrite prompt.
    ConcurrentLimit { limit: usize },
    Full { title: Arc<str> },
    CaptureSucceeded {
        title: Arc<str>,
        amount: f32,
        record_title: String,
    },
    TransmitNoNetwork,
    TransmitNoTransmitter,
    RelayUnavailable { reason: String },
    TransferNoData { title: Arc<str> },
    TransferNoTargetContainer { title: Arc<str>, target: String },
    /// Question asked before handing over the last capture.
    TransferLastCapture { title: Arc<str> },
    TransferInProgress,
    TransferSucceeded { target: String },
    TransferFailed { target: String },
    NoFieldContainer,
    RepairNotQualified { title: Arc<str> },
    RepairCompleted { title: Arc<str> },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Inoperable { title } => {
                write!(f, "[{title}]: Cannot run experiment; science module inoperable")
            }
            Notice::Ineligible { title } => write!(f, "{title} can't be performed here"),
            Notice::UsageRequirementUnmet { message } => f.write_str(message),
            Notice::ConcurrentLimit { limit } => write!(f, "Can only store {limit} sample(s)"),
            Notice::Full { title } => {
                write!(f, "[{title}]: Cannot run experiment; science module full")
            }
            Notice::CaptureSucceeded {
                title,
                amount,
                record_title,
            } => write!(f, "[{title}]: {amount} data from {record_title}"),
            Notice::TransmitNoNetwork => f.write_str("No comm connection; cannot transmit"),
            Notice::TransmitNoTransmitter => f.write_str("No transmitter available"),
            Notice::RelayUnavailable { reason } => f.write_str(reason),
            Notice::TransferNoData { title } => write!(f, "[{title}]: no data to transfer"),
            Notice::TransferNoTargetContainer { title, target } => {
                write!(f, "[{title}]: {target} has no data container")
            }
            Notice::TransferLastCapture { title } => write!(
                f,
                "[{title}]: transferring the data will render the module inoperable"
            ),
            Notice::TransferInProgress => f.write_str("A transfer is already in progress"),
            Notice::TransferSucceeded { target } => write!(f, "Data stored in {target}"),
            Notice::TransferFailed { target } => write!(f, "{target} could not store the data"),
            Notice::NoFieldContainer => f.write_str("No data container at hand"),
            Notice::RepairNotQualified { title } => {
                write!(f, "[{title}]: operator cannot reset the experiment")
            }
            Notice::RepairCompleted { title } => write!(f, "[{title}]: experiment reset"),
        }
    }
}

/// Instrument event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the emitting instrument (or subscriber name for subscriber events).
    pub instrument: Option<Arc<str>>,
    /// Slot index, if applicable.
    pub slot: Option<usize>,
    /// Delay until the next continuation in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Subject id of the record involved.
    pub subject: Option<Arc<str>>,
    /// Prompt id, for prompt events.
    pub prompt: Option<u64>,
    /// User-visible message.
    pub notice: Option<Notice>,
    /// Short machine-readable detail.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            instrument: None,
            slot: None,
            delay_ms: None,
            subject: None,
            prompt: None,
            notice: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_instrument(mut self, id: impl Into<Arc<str>>) -> Self {
        self.instrument = Some(id.into());
        self
    }

    #[inline]
    pub fn with_slot(mut self, slot: impl Into<Option<usize>>) -> Self {
        self.slot = slot.into();
        self
    }

    /// Attaches a continuation delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[inline]
    pub fn with_prompt(mut self, id: u64) -> Self {
        self.prompt = Some(id);
        self
    }

    #[inline]
    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_instrument(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_instrument(subscriber)
            .with_reason(info)
    }
}
