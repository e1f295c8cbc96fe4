//! # Event subscribers.
//!
//! Subscribers receive every event published on an instrument runtime's
//! [`Bus`](crate::events::Bus), each through its own bounded queue and worker.
//!
//! ```text
//!   Instrument ── publish(Event) ──► Bus ──► runtime listener ──► SubscriberSet
//!                                                                   ├──► LogWriter
//!                                                                   └──► custom ...
//! ```
//!
//! - [`Subscribe`]: the extension trait
//! - [`SubscriberSet`]: fan-out with overflow and panic isolation
//! - `LogWriter`: built-in `tracing` writer (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
