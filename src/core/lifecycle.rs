//! # Data lifecycle after capture.
//!
//! Review pages, operator decisions, and every way a record leaves the instrument.
//!
//! ```text
//! review_committed / review_provisional ──► ReviewDesk.present(page)
//!                                                  │
//!               decide(origin, record, decision) ◄─┘
//!                 ├─ Discard  → slot free again
//!                 ├─ Keep     → provisional → committed (or re-present when over capacity)
//!                 ├─ Transmit → Comms, then dispose
//!                 └─ Relay    → Facilities, then dispose
//!
//! collect_external  → field container takes the committed batch
//! transfer_to       → target container takes the committed batch (may ask first)
//! ```
//!
//! ## Rules
//! - Disposing of a record uses up its slot (`returned += 1`); discarding does not.
//! - Decisions about records that are no longer held are no-ops.
//! - A container that refuses a batch leaves every record in place.

use tracing::{debug, info, warn};

use crate::core::instrument::{Instrument, PromptAction, TransferOutcome};
use crate::data::{DataRecord, KeepOutcome, Origin};
use crate::error::InstrumentError;
use crate::events::{Event, EventKind, Notice};
use crate::services::{ExternalId, ReviewDecision, ReviewPage};

impl Instrument {
    /// Presents every committed record. Returns the number of pages shown.
    pub fn review_committed(&mut self) -> usize {
        let last_capture_warning = self.ledger.last_capture_warning();
        let pages: Vec<ReviewPage> = self
            .ledger
            .committed()
            .iter()
            .map(|record| ReviewPage {
                record: record.clone(),
                origin: Origin::Committed,
                last_capture_warning,
            })
            .collect();
        let shown = pages.len();
        for page in pages {
            self.services.review.present(page);
        }
        self.review_open |= shown > 0;
        shown
    }

    /// Presents the head of the provisional list, if any.
    pub fn review_provisional(&mut self) -> bool {
        let Some(record) = self.ledger.provisional().first().cloned() else {
            return false;
        };
        let page = ReviewPage {
            record,
            origin: Origin::Provisional,
            last_capture_warning: self.ledger.last_capture_warning(),
        };
        self.services.review.present(page);
        self.review_open = true;
        true
    }

    /// Applies the operator's decision about a reviewed record.
    pub fn decide(
        &mut self,
        origin: Origin,
        record: &DataRecord,
        decision: ReviewDecision,
    ) -> Result<(), InstrumentError> {
        self.review_open = false;
        match decision {
            ReviewDecision::Discard => {
                self.discard(origin, record);
                Ok(())
            }
            ReviewDecision::Keep => {
                if origin == Origin::Provisional {
                    self.keep_provisional(record);
                }
                Ok(())
            }
            ReviewDecision::Transmit => self.transmit(origin, record),
            ReviewDecision::Relay => self.relay(origin, record),
        }
    }

    fn discard(&mut self, origin: Origin, record: &DataRecord) {
        if !self.ledger.discard(origin, record) {
            debug!(instrument = %self.id, subject = record.subject_id(), "discard of unknown record ignored");
            return;
        }
        let slot = self.slots.slot_of(record);
        if let Some(index) = slot {
            self.slots.deactivate(index, self.services.animator.as_mut());
        }
        info!(instrument = %self.id, slot = ?slot, subject = record.subject_id(), "record discarded");
        self.emit(
            Event::new(EventKind::RecordDiscarded)
                .with_slot(slot)
                .with_subject(record.subject_id()),
        );
    }

    pub(super) fn keep_provisional(&mut self, record: &DataRecord) {
        match self.ledger.keep(record) {
            KeepOutcome::Committed => {
                self.emit(Event::new(EventKind::RecordCommitted).with_subject(record.subject_id()));
            }
            KeepOutcome::OverCapacity => {
                self.notify(Notice::Full {
                    title: self.config.title.clone(),
                });
                self.review_provisional();
            }
            KeepOutcome::Missing => {
                debug!(instrument = %self.id, subject = record.subject_id(), "keep of unknown record ignored");
            }
        }
    }

    fn transmit(&mut self, origin: Origin, record: &DataRecord) -> Result<(), InstrumentError> {
        if !self.holds(origin, record) {
            return Ok(());
        }
        match self.services.comms.best_transmitter() {
            Some(via) => {
                self.services.comms.transmit(&via, vec![record.clone()]);
                info!(instrument = %self.id, via = %via, subject = record.subject_id(), "record transmitted");
                self.dispose(origin, record);
                Ok(())
            }
            None if self.services.comms.network_enabled() => {
                self.notify(Notice::TransmitNoNetwork);
                Err(InstrumentError::NoNetwork)
            }
            None => {
                self.notify(Notice::TransmitNoTransmitter);
                Err(InstrumentError::NoTransmitter)
            }
        }
    }

    fn relay(&mut self, origin: Origin, record: &DataRecord) -> Result<(), InstrumentError> {
        if !self.holds(origin, record) {
            return Ok(());
        }
        match self.services.facilities.find(record) {
            Ok(facility) => {
                self.services.facilities.process(&facility, record.clone());
                info!(instrument = %self.id, facility = %facility, subject = record.subject_id(), "record relayed");
                self.dispose(origin, record);
                Ok(())
            }
            Err(reason) => {
                self.notify(Notice::RelayUnavailable {
                    reason: reason.clone(),
                });
                Err(InstrumentError::NoFacility { reason })
            }
        }
    }

    /// Removes a record that left the instrument, using up its slot.
    ///
    /// Returns `false` when the record is not held in `origin`.
    pub fn dispose(&mut self, origin: Origin, record: &DataRecord) -> bool {
        if !self.ledger.dispose(origin, record) {
            debug!(instrument = %self.id, subject = record.subject_id(), "dispose of unknown record ignored");
            return false;
        }
        let slot = self.retire_slot_of(record);
        info!(
            instrument = %self.id,
            slot = ?slot,
            returned = self.ledger.returned(),
            inoperable = self.ledger.is_inoperable(),
            "record disposed"
        );
        self.emit(
            Event::new(EventKind::RecordDisposed)
                .with_slot(slot)
                .with_subject(record.subject_id()),
        );
        true
    }

    /// Takes back a record handed out earlier; its slot is held again.
    pub fn restore(&mut self, record: DataRecord) {
        let subject = record.subject_id().to_string();
        self.ledger.restore(record.clone());
        let slot = self.slots.restore(record);
        info!(instrument = %self.id, slot = ?slot, subject = %subject, "record restored");
        self.emit(
            Event::new(EventKind::RecordRestored)
                .with_slot(slot)
                .with_subject(subject),
        );
    }

    /// Every record held, committed first.
    pub fn data(&self) -> Vec<DataRecord> {
        self.ledger.data()
    }

    /// Number of records held, committed and provisional.
    pub fn record_count(&self) -> usize {
        self.ledger.occupied()
    }

    /// Hands the committed batch to the field operator's container.
    ///
    /// Returns the number of records collected.
    pub fn collect_external(&mut self) -> Result<usize, InstrumentError> {
        let Some(container) = self.services.containers.field_container() else {
            self.notify(Notice::NoFieldContainer);
            return Err(InstrumentError::NoFieldContainer);
        };
        if self.ledger.committed().is_empty() {
            return Ok(0);
        }
        if !self
            .services
            .containers
            .store(&container, self.ledger.committed())
        {
            warn!(instrument = %self.id, container = %container, "container refused batch");
            self.notify(Notice::TransferFailed {
                target: container.to_string(),
            });
            return Err(InstrumentError::TransferRejected);
        }

        let batch = self.ledger.dispose_committed();
        for record in &batch {
            let slot = self.retire_slot_of(record);
            self.emit(
                Event::new(EventKind::RecordDisposed)
                    .with_slot(slot)
                    .with_subject(record.subject_id()),
            );
        }
        info!(instrument = %self.id, container = %container, count = batch.len(), "batch collected");
        Ok(batch.len())
    }

    /// Hands the committed batch to another container.
    ///
    /// When the hand-off would use up the last capture, a prompt is opened and
    /// nothing moves until it is confirmed.
    pub fn transfer_to(&mut self, target: &ExternalId) -> Result<TransferOutcome, InstrumentError> {
        if self
            .prompts
            .values()
            .any(|a| matches!(a, PromptAction::Transfer(_)))
        {
            self.notify(Notice::TransferInProgress);
            return Err(InstrumentError::AlreadyInProgress);
        }
        self.check_transfer(target)?;

        if self.ledger.last_capture_warning() {
            let prompt = self.open_prompt(
                PromptAction::Transfer(target.clone()),
                Notice::TransferLastCapture {
                    title: self.config.title.clone(),
                },
            );
            return Ok(TransferOutcome::AwaitingConfirmation { prompt });
        }
        self.hand_off(target)
            .map(|count| TransferOutcome::Transferred { count })
    }

    pub(super) fn confirm_transfer(&mut self, target: &ExternalId) -> Result<usize, InstrumentError> {
        self.check_transfer(target)?;
        self.hand_off(target)
    }

    fn check_transfer(&mut self, target: &ExternalId) -> Result<(), InstrumentError> {
        let title = self.config.title.clone();
        if self.ledger.committed().is_empty() {
            self.notify(Notice::TransferNoData { title });
            return Err(InstrumentError::NoData);
        }
        if !self.services.containers.exists(target) {
            self.notify(Notice::TransferNoTargetContainer {
                title,
                target: target.to_string(),
            });
            return Err(InstrumentError::NoTargetContainer);
        }
        Ok(())
    }

    // The container pulls: it stores copies, then every record is disposed here.
    fn hand_off(&mut self, target: &ExternalId) -> Result<usize, InstrumentError> {
        let batch = self.ledger.committed().to_vec();
        if !self.services.containers.store(target, &batch) {
            warn!(instrument = %self.id, target = %target, "transfer refused");
            self.notify(Notice::TransferFailed {
                target: target.to_string(),
            });
            return Err(InstrumentError::TransferRejected);
        }
        for record in &batch {
            self.dispose(Origin::Committed, record);
        }
        self.notify(Notice::TransferSucceeded {
            target: target.to_string(),
        });
        Ok(batch.len())
    }

    fn retire_slot_of(&mut self, record: &DataRecord) -> Option<usize> {
        let slot = self.slots.slot_of(record)?;
        self.slots.retire(slot);
        Some(slot)
    }

    fn holds(&self, origin: Origin, record: &DataRecord) -> bool {
        let list = match origin {
            Origin::Provisional => self.ledger.provisional(),
            Origin::Committed => self.ledger.committed(),
        };
        list.contains(record)
    }
}
