//! # Hand-off seams: transmitters, processing facilities, storage containers.

use std::fmt;
use std::sync::Arc;

use crate::data::DataRecord;

/// Opaque id of an external transmitter, facility, or container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(Arc<str>);

impl ExternalId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Transmission service.
pub trait Comms: Send {
    /// Best transmitter currently usable.
    fn best_transmitter(&self) -> Option<ExternalId>;

    /// Whether a relay network is simulated; picks between the two failure notices.
    fn network_enabled(&self) -> bool;

    /// Queues `records` for transmission. Ownership passes to the transmitter.
    fn transmit(&mut self, via: &ExternalId, records: Vec<DataRecord>);
}

/// Processing facilities that can take over a record.
pub trait Facilities: Send {
    /// Finds a facility for `record`, or explains why none is available.
    fn find(&self, record: &DataRecord) -> Result<ExternalId, String>;

    /// Starts asynchronous processing. Ownership passes to the facility.
    fn process(&mut self, facility: &ExternalId, record: DataRecord);
}

/// Storage containers records can be handed to.
pub trait Containers: Send {
    /// Container carried by the operator in the field, if any.
    fn field_container(&self) -> Option<ExternalId>;

    /// Whether `id` names an existing container.
    fn exists(&self, id: &ExternalId) -> bool;

    /// Offers a batch. `true` means the container took copies of all of them.
    fn store(&mut self, id: &ExternalId, records: &[DataRecord]) -> bool;
}

/// Hand-off seams for an isolated instrument: nothing is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl Comms for Offline {
    fn best_transmitter(&self) -> Option<ExternalId> {
        None
    }

    fn network_enabled(&self) -> bool {
        false
    }

    fn transmit(&mut self, _via: &ExternalId, _records: Vec<DataRecord>) {}
}

impl Facilities for Offline {
    fn find(&self, _record: &DataRecord) -> Result<ExternalId, String> {
        Err("no facility in range".to_string())
    }

    fn process(&mut self, _facility: &ExternalId, _record: DataRecord) {}
}

impl Containers for Offline {
    fn field_container(&self) -> Option<ExternalId> {
        None
    }

    fn exists(&self, _id: &ExternalId) -> bool {
        false
    }

    fn store(&mut self, _id: &ExternalId, _records: &[DataRecord]) -> bool {
        false
    }
}
