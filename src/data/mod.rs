//! Data records and their bookkeeping.
//!
//! ## Contents
//! - [`DataRecord`] immutable capture result
//! - [`Ledger`] provisional/committed lists, slot counters, full/inoperable flags
//! - [`PersistedState`] save/load snapshot (JSON)

mod ledger;
mod persist;
mod record;

pub use ledger::{KeepOutcome, Ledger, Origin, Placement};
pub use persist::{PersistedState, decode_records, encode_records};
pub use record::DataRecord;
