//! Instrument core: state machine, scheduling, and runtimes.
//!
//! Internal modules:
//! - [`instrument`]: the synchronous deploy/capture state machine;
//! - [`lifecycle`]: review, hand-off, and restore of captured records;
//! - [`arbiter`]: decides whether a capture may proceed;
//! - [`slots`]: per-slot occupancy and clip poses;
//! - [`scheduler`]: timed continuations (channel-backed or manual);
//! - [`builder`]: wires collaborators and saved state into an instrument;
//! - [`runtime`]: single-owner async actor around one instrument;
//! - [`registry`]: many runtimes sharing one bus.

mod arbiter;
mod builder;
mod config;
mod instrument;
mod lifecycle;
mod registry;
mod runtime;
mod scheduler;
mod slots;

pub use arbiter::{Arbiter, CaptureRequest, Verdict};
pub use builder::InstrumentBuilder;
pub use config::InstrumentConfig;
pub use instrument::{
    CaptureOutcome, Controls, DeploymentState, Instrument, InstrumentStatus, Resolution,
    TransferOutcome,
};
pub use registry::InstrumentRegistry;
pub use runtime::{InstrumentHandle, InstrumentRuntime};
pub use scheduler::{ChannelScheduler, ManualScheduler, Scheduled, Scheduler};
pub use slots::{SlotPool, SlotState};
