//! # samplebay
//!
//! **Samplebay** drives deployable sample instruments: a door sequence that
//! deploys and retracts, one or more sample slots, and the review and hand-off
//! lifecycle of the records those slots capture.
//!
//! The state machine ([`Instrument`]) is synchronous and owns its collaborators
//! through small traits (animator, environment, operator, comms, containers).
//! Timed steps are delegated to a [`Scheduler`], so the same instrument runs under
//! a host tick loop ([`ManualScheduler`]) or inside tokio ([`InstrumentRuntime`]).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   InstrumentHandle        InstrumentHandle        InstrumentHandle
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  InstrumentRegistry (one runtime per id, shared bus, child tokens) │
//! └──────┬──────────────────────┬──────────────────────┬──────────────┘
//!        ▼                      ▼                      ▼
//!  ┌────────────┐         ┌────────────┐         ┌────────────┐
//!  │  runtime   │         │  runtime   │         │  runtime   │
//!  │ (actor +   │         │ (actor +   │         │ (actor +   │
//!  │  wakeups)  │         │  wakeups)  │         │  wakeups)  │
//!  └─────┬──────┘         └─────┬──────┘         └─────┬──────┘
//!        │ Instrument: Arbiter ─ Ledger ─ SlotPool ─ Services
//!        ▼                      ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter    sub2       subN
//! ```
//!
//! ### Deploy / capture lifecycle
//! ```text
//! capture() ──► Arbiter::can_capture
//!                 ├─ Denied(err)        ─► notice, Err(err)
//!                 ├─ NeedsOverwrite     ─► prompt opened, Err(CapacityConflict)
//!                 └─ Proceed
//!                      ├─ deployed / direct ─► sample ─► Ledger ─► review or keep
//!                      └─ retracted         ─► deploy (doors ─► slots) ─► capture
//!
//! toggle() ──► Retracted/Retracting ─► doors open ─► wait ─► slots out ─► Deployed
//!          └─► Deployed/Deploying   ─► slots stowed ─► wait ─► doors shut ─► Retracted
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **State machine** | Deploy/retract choreography, capture arbitration, prompts.    | [`Instrument`], [`InstrumentBuilder`]           |
//! | **Records**       | Committed and provisional records, review, hand-off.          | [`DataRecord`], [`Ledger`], [`Origin`]          |
//! | **Runtime**       | Async actor, many-instrument registry.                        | [`InstrumentRuntime`], [`InstrumentRegistry`]   |
//! | **Collaborators** | Host integration seams.                                       | [`Animator`], [`Environment`], [`Comms`], ...   |
//! | **Subscriber API**| Hook into instrument events.                                  | [`Subscribe`]                                   |
//! | **Persistence**   | Save/load state, TOML configuration.                          | [`PersistedState`], [`InstrumentConfig`]        |
//! | **Errors**        | Typed refusals and persistence failures.                      | [`InstrumentError`], [`PersistError`]           |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use samplebay::{
//!     DeploymentState, Environment, DataRecord, InstrumentBuilder, InstrumentConfig,
//!     InstrumentRuntime,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct Field;
//!
//! impl Environment for Field {
//!     fn capture_allowed(&self) -> bool { true }
//!     fn sample(&mut self) -> Option<DataRecord> {
//!         Some(DataRecord::new(4.0, "goo@kerbin", "Mystery Goo from Kerbin"))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InstrumentConfig::from_toml_str("title = \"Goo\"\ncapacity = 2")?;
//!     let runtime = InstrumentRuntime::spawn(
//!         InstrumentBuilder::new("bay-1", config, Field),
//!         CancellationToken::new(),
//!     );
//!
//!     let bay = runtime.handle();
//!     bay.capture(true).await?;
//!     assert_eq!(bay.status().await?.state, DeploymentState::Deployed);
//!
//!     let saved = runtime.shutdown().await?;
//!     println!("{}", saved.to_json()?);
//!     Ok(())
//! }
//! ```
mod core;
mod data;
mod error;
mod events;
mod services;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use crate::core::{
    Arbiter, CaptureOutcome, CaptureRequest, ChannelScheduler, Controls, DeploymentState,
    Instrument, InstrumentBuilder, InstrumentConfig, InstrumentHandle, InstrumentRegistry,
    InstrumentRuntime, InstrumentStatus, ManualScheduler, Resolution, Scheduled, Scheduler,
    SlotPool, SlotState, TransferOutcome, Verdict,
};
pub use data::{
    DataRecord, KeepOutcome, Ledger, Origin, PersistedState, Placement, decode_records,
    encode_records,
};
pub use error::{InstrumentError, PersistError, RegistryError};
pub use events::{Bus, Event, EventKind, Notice};
pub use services::{
    Animator, Comms, ConfirmRequest, Containers, Decision, Direction, Environment, ExternalId,
    Facilities, Headless, NoAnimator, Offline, Prompt, ReviewDecision, ReviewDesk, ReviewPage,
    Services, UiRefresh,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
