//! # Record ledger: provisional and committed collections.
//!
//! The [`Ledger`] owns both record lists and the counters derived from them.
//! It never talks to collaborators and knows nothing about slots; callers map
//! records onto the slot pool and drive the animator themselves.
//!
//! ## Lifecycle
//! ```text
//!            capture (multi-slot)        keep
//! sampler ───────────────────► provisional ─────► committed
//!    │                              │                 │
//!    │ capture (single-slot)        │ discard         │ discard
//!    └──────────────────────────────┼─────────────────►│
//!                                   ▼                 ▼
//!                        dispose (transmit/relay)  dispose / collect / transfer
//!                           returned += 1            returned += n
//! ```
//!
//! ## Rules
//! - A record lives in exactly one list; every transition moves it.
//! - `returned` never exceeds capacity, only grows through disposal and only
//!   shrinks through [`Ledger::restore`] or a reset.
//! - `inoperable` is only ever recomputed after disposal as `!rerunnable()`.

use super::record::DataRecord;

/// Which list a record currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Provisional,
    Committed,
}

/// Where a captured record was put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Appended into a free slot.
    Appended {
        /// Slot index the record occupies.
        slot: usize,
    },
    /// Replaced an existing record and took over its slot.
    Replaced,
    /// Appended while every slot was held; no slot holds it.
    Overflow,
}

/// Result of a keep decision on a provisional record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepOutcome {
    Committed,
    /// More records than capacity; the record stays provisional.
    OverCapacity,
    /// The record was not in the provisional list.
    Missing,
}

/// Owner of the two record lists and of the full/inoperable flags.
#[derive(Debug, Clone)]
pub struct Ledger {
    capacity: usize,
    rerun_anytime: bool,

    provisional: Vec<DataRecord>,
    committed: Vec<DataRecord>,

    returned: usize,
    total_captures: u64,
    full: bool,
    inoperable: bool,
}

impl Ledger {
    /// Creates an empty ledger. Capacity is clamped to at least 1.
    pub fn new(capacity: usize, rerun_anytime: bool) -> Self {
        Self {
            capacity: capacity.max(1),
            rerun_anytime,
            provisional: Vec::new(),
            committed: Vec::new(),
            returned: 0,
            total_captures: 0,
            full: false,
            inoperable: false,
        }
    }

    /// Rebuilds a ledger from persisted lists and counters.
    ///
    /// Flags are recomputed from the counters, the same way disposal does.
    pub fn restore_from(
        capacity: usize,
        rerun_anytime: bool,
        committed: Vec<DataRecord>,
        provisional: Vec<DataRecord>,
        returned: usize,
        total_captures: u64,
    ) -> Self {
        let mut ledger = Self::new(capacity, rerun_anytime);
        ledger.committed = committed;
        ledger.provisional = if ledger.is_multi_slot() {
            provisional
        } else {
            Vec::new()
        };
        ledger.returned = returned.min(ledger.capacity);
        ledger.total_captures = total_captures;
        ledger.inoperable = !ledger.rerunnable();
        ledger.full = ledger.inoperable || ledger.occupied() >= ledger.capacity;
        ledger
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_multi_slot(&self) -> bool {
        self.capacity > 1
    }

    /// Records currently held (provisional + committed).
    #[inline]
    pub fn occupied(&self) -> usize {
        self.provisional.len() + self.committed.len()
    }

    #[inline]
    pub fn returned(&self) -> usize {
        self.returned
    }

    #[inline]
    pub fn total_captures(&self) -> u64 {
        self.total_captures
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    #[inline]
    pub fn is_inoperable(&self) -> bool {
        self.inoperable
    }

    pub fn provisional(&self) -> &[DataRecord] {
        &self.provisional
    }

    pub fn committed(&self) -> &[DataRecord] {
        &self.committed
    }

    /// All records, committed first, then provisional.
    pub fn data(&self) -> Vec<DataRecord> {
        self.committed
            .iter()
            .chain(self.provisional.iter())
            .cloned()
            .collect()
    }

    /// Whether the instrument may still produce captures.
    #[inline]
    pub fn rerunnable(&self) -> bool {
        self.rerun_anytime || self.returned < self.capacity
    }

    /// True when the next disposal uses up the last capture.
    #[inline]
    pub fn last_capture_warning(&self) -> bool {
        self.returned + 1 >= self.capacity && !self.rerun_anytime
    }

    /// Stores a freshly captured record.
    ///
    /// Single-slot: overwrite replaces the committed record, otherwise appends;
    /// the ledger becomes full either way.
    ///
    /// Multi-slot: overwrite prefers the head of the provisional list, then pulls
    /// the newest committed record back out; without overwrite (or with nothing to
    /// replace) the record is appended to the provisional list.
    ///
    /// Returns the record that was replaced, or `None` when the capture appended.
    pub fn capture(&mut self, record: DataRecord, overwrite: bool) -> Option<DataRecord> {
        self.total_captures += 1;

        if !self.is_multi_slot() {
            let displaced = match self.committed.first_mut() {
                Some(existing) if overwrite => Some(std::mem::replace(existing, record)),
                _ => {
                    self.committed.push(record);
                    None
                }
            };
            self.full = true;
            return displaced;
        }

        let displaced = match self.provisional.first_mut() {
            Some(head) if overwrite => Some(std::mem::replace(head, record)),
            _ => {
                let pulled = if overwrite { self.committed.pop() } else { None };
                self.provisional.push(record);
                pulled
            }
        };

        self.full = self.occupied() >= self.capacity;
        displaced
    }

    /// Removes a record without using up its slot.
    ///
    /// Returns `false` when the record is not in `origin`.
    pub fn discard(&mut self, origin: Origin, record: &DataRecord) -> bool {
        if remove_first(self.list_mut(origin), record).is_none() {
            return false;
        }
        self.full = false;
        true
    }

    /// Moves a provisional record into the committed list.
    pub fn keep(&mut self, record: &DataRecord) -> KeepOutcome {
        if self.occupied() > self.capacity {
            return KeepOutcome::OverCapacity;
        }
        match remove_first(&mut self.provisional, record) {
            Some(r) => {
                self.committed.push(r);
                KeepOutcome::Committed
            }
            None => KeepOutcome::Missing,
        }
    }

    /// Removes a record whose consumable was used up (transmit, relay, pull).
    ///
    /// Returns `false` when the record is not in `origin`.
    pub fn dispose(&mut self, origin: Origin, record: &DataRecord) -> bool {
        if remove_first(self.list_mut(origin), record).is_none() {
            return false;
        }
        self.returned = (self.returned + 1).min(self.capacity);
        self.after_disposal();
        true
    }

    /// Removes the whole committed list in one batch and returns it.
    pub fn dispose_committed(&mut self) -> Vec<DataRecord> {
        let batch = std::mem::take(&mut self.committed);
        self.returned = (self.returned + batch.len()).min(self.capacity);
        self.after_disposal();
        batch
    }

    /// Takes back a record previously disposed to the outside.
    pub fn restore(&mut self, record: DataRecord) {
        self.committed.push(record);
        self.returned = self.returned.saturating_sub(1);
        self.inoperable = false;
        self.full = !self.is_multi_slot() || self.occupied() >= self.capacity;
    }

    /// Clears both lists and both flags.
    pub fn reset_experiment(&mut self) {
        self.provisional.clear();
        self.committed.clear();
        self.full = false;
        self.inoperable = false;
    }

    /// Clears everything, including the returned counter.
    pub fn reset_external(&mut self) {
        self.provisional.clear();
        self.committed.clear();
        self.returned = 0;
        self.full = false;
        self.inoperable = false;
    }

    fn after_disposal(&mut self) {
        self.inoperable = !self.rerunnable();
        self.full = self.inoperable;
    }

    fn list_mut(&mut self, origin: Origin) -> &mut Vec<DataRecord> {
        match origin {
            Origin::Provisional => &mut self.provisional,
            Origin::Committed => &mut self.committed,
        }
    }
}

fn remove_first(list: &mut Vec<DataRecord>, record: &DataRecord) -> Option<DataRecord> {
    let idx = list.iter().position(|r| r == record)?;
    Some(list.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(n: u32) -> DataRecord {
        DataRecord::new(n as f32, format!("subject-{n}"), format!("Sample {n}")).with_source(n)
    }

    #[test]
    fn test_full_after_capacity_captures() {
        for capacity in 1..=5 {
            let mut ledger = Ledger::new(capacity, false);
            for n in 0..capacity as u32 {
                assert!(!ledger.is_full(), "capacity {capacity}: full too early");
                ledger.capture(rec(n), false);
            }
            assert!(ledger.is_full(), "capacity {capacity}: not full");
            assert_eq!(ledger.occupied(), capacity);
        }
    }

    #[test]
    fn test_single_slot_overwrite_replaces_committed() {
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);
        let displaced = ledger.capture(rec(2), true);

        assert_eq!(displaced, Some(rec(1)));
        assert_eq!(ledger.committed(), &[rec(2)]);
        assert!(ledger.is_full());
    }

    #[test]
    fn test_multi_slot_overwrite_prefers_provisional_head() {
        let mut ledger = Ledger::new(3, false);
        ledger.capture(rec(1), false);
        ledger.capture(rec(2), false);
        assert_eq!(ledger.capture(rec(3), true), Some(rec(1)));

        assert_eq!(ledger.provisional(), &[rec(3), rec(2)]);
        assert!(ledger.committed().is_empty());
    }

    #[test]
    fn test_multi_slot_overwrite_pulls_back_newest_committed() {
        let mut ledger = Ledger::new(3, false);
        ledger.capture(rec(1), false);
        ledger.keep(&rec(1));
        ledger.capture(rec(2), false);
        ledger.keep(&rec(2));

        let displaced = ledger.capture(rec(3), true);
        assert_eq!(displaced, Some(rec(2)));
        assert_eq!(ledger.committed(), &[rec(1)]);
        assert_eq!(ledger.provisional(), &[rec(3)]);
        assert_eq!(ledger.occupied(), 2);
    }

    #[test]
    fn test_discard_clears_full() {
        let mut ledger = Ledger::new(2, false);
        ledger.capture(rec(1), false);
        ledger.capture(rec(2), false);
        assert!(ledger.is_full());

        assert!(ledger.discard(Origin::Provisional, &rec(1)));
        assert!(!ledger.is_full());
        assert_eq!(ledger.provisional(), &[rec(2)]);
    }

    #[test]
    fn test_discard_unknown_record_is_noop() {
        let mut ledger = Ledger::new(2, false);
        ledger.capture(rec(1), false);
        ledger.capture(rec(2), false);

        assert!(!ledger.discard(Origin::Committed, &rec(1)));
        assert!(!ledger.dispose(Origin::Committed, &rec(9)));
        assert!(ledger.is_full());
        assert_eq!(ledger.occupied(), 2);
        assert_eq!(ledger.returned(), 0);
    }

    #[test]
    fn test_keep_over_capacity_stays_provisional() {
        let mut ledger = Ledger::new(2, false);
        ledger.capture(rec(1), false);
        ledger.keep(&rec(1));
        ledger.capture(rec(2), false);
        ledger.restore(rec(3));
        assert_eq!(ledger.occupied(), 3);

        assert_eq!(ledger.keep(&rec(2)), KeepOutcome::OverCapacity);
        assert_eq!(ledger.provisional(), &[rec(2)]);
    }

    #[test]
    fn test_dispose_last_capture_makes_inoperable() {
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);
        assert!(ledger.last_capture_warning());

        assert!(ledger.dispose(Origin::Committed, &rec(1)));
        assert_eq!(ledger.returned(), 1);
        assert!(ledger.is_inoperable());
        assert!(ledger.is_full());
    }

    #[test]
    fn test_dispose_with_rerun_flag_stays_operable() {
        let mut ledger = Ledger::new(1, true);
        ledger.capture(rec(1), false);
        ledger.dispose(Origin::Committed, &rec(1));
        ledger.capture(rec(2), false);
        ledger.dispose(Origin::Committed, &rec(2));

        assert!(!ledger.is_inoperable());
        assert!(!ledger.is_full());
        assert_eq!(ledger.returned(), 1, "returned is capped at capacity");
    }

    #[test]
    fn test_dispose_committed_batch() {
        let mut ledger = Ledger::new(4, false);
        for n in 0..3 {
            ledger.capture(rec(n), false);
            ledger.keep(&rec(n));
        }
        let batch = ledger.dispose_committed();

        assert_eq!(batch.len(), 3);
        assert_eq!(ledger.returned(), 3);
        assert!(ledger.committed().is_empty());
        assert!(!ledger.is_inoperable());
    }

    #[test]
    fn test_restore_takes_back_a_returned_slot() {
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);
        ledger.dispose(Origin::Committed, &rec(1));
        assert!(ledger.is_inoperable());

        ledger.restore(rec(1));
        assert_eq!(ledger.returned(), 0);
        assert!(!ledger.is_inoperable());
        assert!(ledger.is_full());
        assert_eq!(ledger.occupied(), 1);
    }

    #[test]
    fn test_reset_experiment_is_idempotent() {
        let mut ledger = Ledger::new(3, false);
        ledger.capture(rec(1), false);
        ledger.capture(rec(2), false);
        ledger.keep(&rec(1));
        ledger.dispose(Origin::Committed, &rec(1));

        ledger.reset_experiment();
        let once = format!("{ledger:?}");
        ledger.reset_experiment();
        assert_eq!(format!("{ledger:?}"), once);
        assert_eq!(ledger.occupied(), 0);
        assert_eq!(ledger.returned(), 1, "experiment reset keeps returned slots");
    }

    #[test]
    fn test_restore_from_recomputes_flags() {
        let ledger = Ledger::restore_from(2, false, vec![rec(1)], vec![rec(2)], 0, 2);
        assert!(ledger.is_full());
        assert!(!ledger.is_inoperable());

        let spent = Ledger::restore_from(2, false, vec![], vec![], 2, 2);
        assert!(spent.is_inoperable());
        assert!(spent.is_full());
    }
}
