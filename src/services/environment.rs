//! # Situation queries and sampling.

use crate::data::DataRecord;

/// Everything the instrument needs to know about where it is and who operates it.
pub trait Environment: Send {
    /// Whether capture is possible in the current situation.
    fn capture_allowed(&self) -> bool;

    /// Whether the request comes from an operator outside the vehicle.
    fn operator_in_field(&self) -> bool {
        false
    }

    /// Message describing the unmet usage requirement for a field operator, if any.
    fn unmet_usage_requirement(&self) -> Option<String> {
        None
    }

    /// Whether the field operator can repair a spent instrument.
    fn operator_can_repair(&self) -> bool {
        false
    }

    /// Produces a record for the current situation. `None` aborts the capture.
    fn sample(&mut self) -> Option<DataRecord>;
}
