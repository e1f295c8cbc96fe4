//! # Persisted instrument state.
//!
//! [`PersistedState`] is everything an instrument needs to come back after a
//! save/load cycle: the deployment flag, the slot counters, and both record lists
//! in order. The encoding is JSON (`serde_json`); the wire layout of each record is
//! self-contained, so lists can also be moved between instruments.
//!
//! ## Example
//! ```rust
//! use samplebay::{DataRecord, PersistedState};
//!
//! let mut state = PersistedState::default();
//! state.committed.push(DataRecord::new(4.0, "temp@KerbinSrfLanded", "Temperature scan"));
//!
//! let json = state.to_json().unwrap();
//! let back = PersistedState::from_json(&json).unwrap();
//! assert_eq!(back, state);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PersistError;

use super::record::DataRecord;

/// Snapshot written on save and read on load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// Whether the instrument was deployed (or deploying) when saved.
    pub is_deployed: bool,
    /// Whether the door sequence is bypassed.
    pub direct_mode: Option<bool>,
    /// Slots whose consumable has been used up.
    pub returned_slots: usize,
    /// Captures performed so far, overwrites included.
    pub total_captures: u64,
    /// Committed records, in commit order.
    pub committed: Vec<DataRecord>,
    /// Provisional records, in capture order (multi-slot only).
    pub provisional: Vec<DataRecord>,
}

impl PersistedState {
    /// Encodes the state as JSON.
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(PersistError::Encode)
    }

    /// Decodes a state previously produced by [`PersistedState::to_json`].
    pub fn from_json(s: &str) -> Result<Self, PersistError> {
        serde_json::from_str(s).map_err(PersistError::Decode)
    }
}

/// Encodes a bare list of records.
pub fn encode_records(records: &[DataRecord]) -> Result<String, PersistError> {
    serde_json::to_string(records).map_err(PersistError::Encode)
}

/// Decodes a bare list of records, preserving order.
pub fn decode_records(s: &str) -> Result<Vec<DataRecord>, PersistError> {
    serde_json::from_str(s).map_err(PersistError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<DataRecord> {
        vec![
            DataRecord::new(12.5, "goo@MunSrfLanded", "Mystery goo, Mun surface")
                .with_transmit(0.3, 0.1)
                .with_source(7),
            DataRecord::new(0.0, "", "").with_recoverable(true),
            DataRecord::new(3.25, "temp@KerbinFlyingLow", "Temperature, \"low\" flight")
                .with_transmit(1.0, 0.0)
                .with_source(u32::MAX),
        ]
    }

    #[test]
    fn test_records_survive_round_trip_in_order() {
        let records = sample_records();
        let json = encode_records(&records).unwrap();
        let back = decode_records(&json).unwrap();
        assert_eq!(back, records);

        let again = encode_records(&back).unwrap();
        assert_eq!(again, json);
    }

    #[test]
    fn test_state_round_trip() {
        let state = PersistedState {
            is_deployed: true,
            direct_mode: Some(false),
            returned_slots: 2,
            total_captures: 5,
            committed: sample_records(),
            provisional: vec![DataRecord::new(1.0, "a", "b")],
        };
        let back = PersistedState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let state = PersistedState::from_json(r#"{"is_deployed":true}"#).unwrap();
        assert!(state.is_deployed);
        assert_eq!(state.returned_slots, 0);
        assert!(state.committed.is_empty());
        assert_eq!(state.direct_mode, None);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = PersistedState::from_json("not json").unwrap_err();
        assert_eq!(err.as_label(), "persist_decode");
    }
}
