//! # Data records produced by a capture.
//!
//! A [`DataRecord`] is an immutable value: it is created once by the capture step
//! and then only moved between collections (provisional → committed → gone).
//! Identity is value identity: two records compare equal when every field matches,
//! and disposal removes the first equal record it finds.
//!
//! ## Example
//! ```rust
//! use samplebay::DataRecord;
//!
//! let r = DataRecord::new(12.0, "soil@MunSrfLanded", "Soil sample from the Mun")
//!     .with_transmit(0.3, 0.0)
//!     .with_source(42);
//!
//! assert_eq!(r.amount(), 12.0);
//! assert_eq!(r.subject_id(), "soil@MunSrfLanded");
//! assert_eq!(r.source_id(), 42);
//! ```

use serde::{Deserialize, Serialize};

/// One captured result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    amount: f32,
    subject_id: String,
    title: String,
    transmit_value: f32,
    transmit_bonus: f32,
    source_id: u32,
    #[serde(default)]
    recoverable: bool,
}

impl DataRecord {
    /// Creates a record with no transmit value and no source part.
    pub fn new(amount: f32, subject_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            amount,
            subject_id: subject_id.into(),
            title: title.into(),
            transmit_value: 0.0,
            transmit_bonus: 0.0,
            source_id: 0,
            recoverable: false,
        }
    }

    /// Sets the transmit value and bonus.
    #[inline]
    pub fn with_transmit(mut self, value: f32, bonus: f32) -> Self {
        self.transmit_value = value;
        self.transmit_bonus = bonus;
        self
    }

    /// Sets the id of the part that produced the record.
    #[inline]
    pub fn with_source(mut self, source_id: u32) -> Self {
        self.source_id = source_id;
        self
    }

    #[inline]
    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Display title, opaque to the instrument.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn transmit_value(&self) -> f32 {
        self.transmit_value
    }

    pub fn transmit_bonus(&self) -> f32 {
        self.transmit_bonus
    }

    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    pub fn recoverable(&self) -> bool {
        self.recoverable
    }
}
