//! Instrument events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Notice`] typed user-visible messages
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Instrument` (sequences, records, notices, prompts),
//!   `InstrumentRegistry`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime fan-out listener feeding `SubscriberSet`, plus any
//!   receiver the host takes from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Notice};
