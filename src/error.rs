//! Error types used by the instrument and its persistence layer.
//!
//! This module defines three error enums:
//!
//! - [`InstrumentError`]: an operation was refused; state is left unchanged.
//! - [`PersistError`]: saved state or configuration could not be encoded/decoded.
//! - [`RegistryError`]: registry bookkeeping failed (unknown or duplicate id, lost state).
//!
//! All provide `as_label` (stable snake_case for logs) and `as_message`.

use thiserror::Error;

/// # Reasons an instrument operation was refused.
///
/// Every variant is resolved locally: the instrument posts a notice and aborts the
/// requested operation only. None of them leaves a partial record or an orphaned
/// slot behind.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    /// The instrument used up its last capture.
    #[error("instrument inoperable")]
    Inoperable,

    /// Capture is not possible in the current situation.
    #[error("capture not available in current situation")]
    Ineligible,

    /// The field operator does not meet the usage requirement.
    #[error("usage requirement unmet: {message}")]
    UsageRequirementUnmet {
        /// Message supplied by the environment.
        message: String,
    },

    /// The concurrent-capture cap is reached; an overwrite prompt was opened.
    #[error("concurrent capture limit {limit} reached")]
    CapacityConflict {
        /// Configured cap.
        limit: usize,
        /// Prompt to answer to continue the capture.
        prompt: u64,
    },

    /// Every slot is occupied.
    #[error("instrument full")]
    Full,

    /// No transmitter available.
    #[error("no transmitter available")]
    NoTransmitter,

    /// Transmitters exist but none has a connection.
    #[error("no network connection")]
    NoNetwork,

    /// No processing facility accepts the record.
    #[error("no facility available: {reason}")]
    NoFacility {
        /// Reason given by the facility search.
        reason: String,
    },

    /// The transfer target has no container.
    #[error("target has no data container")]
    NoTargetContainer,

    /// Nothing committed to transfer.
    #[error("no data to transfer")]
    NoData,

    /// The container refused the batch.
    #[error("container rejected the data")]
    TransferRejected,

    /// The operator in the field carries no container.
    #[error("no field container")]
    NoFieldContainer,

    /// The operator in the field cannot repair the instrument.
    #[error("operator not qualified to repair")]
    RepairNotQualified,

    /// A deploy/retract sequence or transfer is already in flight.
    #[error("operation already in progress")]
    AlreadyInProgress,

    /// The prompt being answered is no longer open.
    #[error("prompt {id} is not open")]
    StalePrompt {
        /// Id of the answered prompt.
        id: u64,
    },

    /// The runtime owning the instrument has stopped.
    #[error("instrument runtime stopped")]
    Closed,
}

impl InstrumentError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use samplebay::InstrumentError;
    ///
    /// assert_eq!(InstrumentError::Full.as_label(), "instrument_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InstrumentError::Inoperable => "instrument_inoperable",
            InstrumentError::Ineligible => "capture_ineligible",
            InstrumentError::UsageRequirementUnmet { .. } => "usage_requirement_unmet",
            InstrumentError::CapacityConflict { .. } => "capacity_conflict",
            InstrumentError::Full => "instrument_full",
            InstrumentError::NoTransmitter => "no_transmitter",
            InstrumentError::NoNetwork => "no_network",
            InstrumentError::NoFacility { .. } => "no_facility",
            InstrumentError::NoTargetContainer => "no_target_container",
            InstrumentError::NoData => "no_data",
            InstrumentError::TransferRejected => "transfer_rejected",
            InstrumentError::NoFieldContainer => "no_field_container",
            InstrumentError::RepairNotQualified => "repair_not_qualified",
            InstrumentError::AlreadyInProgress => "already_in_progress",
            InstrumentError::StalePrompt { .. } => "stale_prompt",
            InstrumentError::Closed => "runtime_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            InstrumentError::UsageRequirementUnmet { message } => format!("usage: {message}"),
            InstrumentError::CapacityConflict { limit, prompt } => {
                format!("limit: {limit}, prompt: {prompt}")
            }
            InstrumentError::NoFacility { reason } => format!("facility: {reason}"),
            InstrumentError::StalePrompt { id } => format!("prompt: {id}"),
            other => other.to_string(),
        }
    }

    /// Indicates whether a second inbound call can still complete the operation.
    ///
    /// Only [`InstrumentError::CapacityConflict`] qualifies: confirming the
    /// overwrite prompt resumes the capture.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InstrumentError::CapacityConflict { .. })
    }
}

/// # Errors produced while saving or loading.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PersistError {
    /// State could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// State could not be parsed.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Configuration could not be parsed.
    #[error("config parse failed: {0}")]
    Config(#[from] toml::de::Error),
}

impl PersistError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PersistError::Encode(_) => "persist_encode",
            PersistError::Decode(_) => "persist_decode",
            PersistError::Config(_) => "config_parse",
        }
    }
}

/// # Errors produced by the instrument registry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An instrument with this id is already running.
    #[error("instrument {id} already registered")]
    AlreadyRegistered {
        /// Duplicate id.
        id: String,
    },

    /// No instrument with this id.
    #[error("instrument {id} not found")]
    NotFound {
        /// Requested id.
        id: String,
    },

    /// The instrument task ended abnormally; its final state is unknown.
    #[error("instrument {id} stopped abnormally; state lost")]
    Stopped {
        /// Id of the failed instrument.
        id: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered { .. } => "instrument_already_registered",
            RegistryError::NotFound { .. } => "instrument_not_found",
            RegistryError::Stopped { .. } => "instrument_stopped_abnormally",
        }
    }
}
