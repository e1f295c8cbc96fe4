//! # Sample slot pool.
//!
//! A fixed array of slots, one per unit of capture capacity. Each slot may own a
//! dedicated clip (`{prefix}{index + 1}`); occupancy changes drive that clip
//! through the [`Animator`]. The pool decides where a record goes and remembers
//! which record each held slot belongs to.
//!
//! ## States
//! ```text
//!            activate                retire
//!   Empty ─────────────► Holding ─────────────► Returned
//!     ▲                     │                       │
//!     └──── deactivate ─────┘◄──── restore ─────────┘
//!     ▲                                             │
//!     └──────────────────── reset ──────────────────┘
//! ```
//!
//! ## Rules
//! - Indices outside `[0, capacity)` are ignored by every operation.
//! - A new record takes the lowest empty slot; with none empty, the lowest returned
//!   slot is reused. Only a pool with every slot held turns a record away.
//! - `stow_held` / `extend_held` only move clips; they never change state.
//! - `retire` and `restore` do not animate; the clip keeps its pose.

use std::time::Duration;

use crate::core::config::InstrumentConfig;
use crate::data::DataRecord;
use crate::services::{Animator, Direction};

/// State of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Free for a new capture.
    Empty,
    /// Occupied by a record.
    Holding,
    /// Consumable used up; unusable until a full reset.
    Returned,
}

struct Slot {
    state: SlotState,
    clip: Option<String>,
    record: Option<DataRecord>,
}

/// Fixed-capacity array of sample slots.
pub struct SlotPool {
    slots: Vec<Slot>,
}

impl SlotPool {
    /// Creates `config.capacity_clamped()` empty slots.
    pub fn new(config: &InstrumentConfig) -> Self {
        let slots = (0..config.capacity_clamped())
            .map(|i| Slot {
                state: SlotState::Empty,
                clip: config.slot_clip(i),
                record: None,
            })
            .collect();
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|s| s.state)
    }

    pub fn is_held(&self, index: usize) -> bool {
        self.state(index) == Some(SlotState::Holding)
    }

    pub fn held_count(&self) -> usize {
        self.count(SlotState::Holding)
    }

    pub fn returned_count(&self) -> usize {
        self.count(SlotState::Returned)
    }

    /// Indices of held slots, lowest first.
    pub fn held(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == SlotState::Holding)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the held slot bound to `record`.
    pub fn slot_of(&self, record: &DataRecord) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.state == SlotState::Holding && s.record.as_ref() == Some(record))
    }

    /// Binds `record` to a free slot and extends its clip.
    ///
    /// Returns `None` when every slot is held.
    pub fn claim(&mut self, record: DataRecord, animator: &mut dyn Animator) -> Option<usize> {
        let index = self.vacant()?;
        self.slots[index].record = Some(record);
        self.activate(index, animator);
        Some(index)
    }

    /// Hands the slot held by `old` over to `new`; nothing is animated.
    pub fn rebind(&mut self, old: &DataRecord, new: DataRecord) -> Option<usize> {
        let index = self.slot_of(old)?;
        self.slots[index].record = Some(new);
        Some(index)
    }

    /// Marks the slot held and extends its clip.
    pub fn activate(&mut self, index: usize, animator: &mut dyn Animator) -> Duration {
        self.transition(index, SlotState::Holding, Some(Direction::Extend), animator)
    }

    /// Marks the slot empty and retracts its clip.
    pub fn deactivate(&mut self, index: usize, animator: &mut dyn Animator) -> Duration {
        self.transition(index, SlotState::Empty, Some(Direction::Retract), animator)
    }

    /// Marks the slot empty without moving its clip.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = SlotState::Empty;
            slot.record = None;
        }
    }

    /// Marks the slot returned.
    pub fn retire(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = SlotState::Returned;
            slot.record = None;
        }
    }

    /// Binds a record taken back from outside, preferring a returned slot.
    ///
    /// Returns `None` when every slot is held.
    pub fn restore(&mut self, record: DataRecord) -> Option<usize> {
        let index = self
            .position(SlotState::Returned)
            .or_else(|| self.position(SlotState::Empty))?;
        let slot = &mut self.slots[index];
        slot.state = SlotState::Holding;
        slot.record = Some(record);
        Some(index)
    }

    /// Retracts the clip of every held slot, newest first.
    ///
    /// Returns the longest clip duration.
    pub fn stow_held(&mut self, animator: &mut dyn Animator) -> Duration {
        self.play_held(Direction::Retract, animator)
    }

    /// Extends the clip of every held slot, newest first.
    ///
    /// Returns the longest clip duration.
    pub fn extend_held(&mut self, animator: &mut dyn Animator) -> Duration {
        self.play_held(Direction::Extend, animator)
    }

    /// Puts every held clip straight into its end pose for `direction`.
    ///
    /// Used to restore poses after loading; nothing is waited on.
    pub fn snap_held(&self, direction: Direction, animator: &mut dyn Animator) {
        for clip in self
            .slots
            .iter()
            .filter(|s| s.state == SlotState::Holding)
            .filter_map(|s| s.clip.as_deref())
        {
            animator.play(clip, direction, 1.0, direction.end_time());
        }
    }

    /// Frees every slot and rewinds every clip to the stowed pose.
    pub fn reset(&mut self, animator: &mut dyn Animator) {
        for slot in &mut self.slots {
            slot.state = SlotState::Empty;
            slot.record = None;
            if let Some(clip) = &slot.clip {
                animator.play(clip, Direction::Retract, 1.0, 0.0);
            }
        }
    }

    /// Rebuilds states after loading: `[0, returned)` returned, then each record
    /// bound the way [`claim`](Self::claim) would place it. No clip is played.
    pub fn load(&mut self, returned: usize, records: &[DataRecord]) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.state = if i < returned {
                SlotState::Returned
            } else {
                SlotState::Empty
            };
            slot.record = None;
        }
        for record in records {
            let Some(index) = self.vacant() else { break };
            let slot = &mut self.slots[index];
            slot.state = SlotState::Holding;
            slot.record = Some(record.clone());
        }
    }

    fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|s| s.state == state).count()
    }

    fn position(&self, state: SlotState) -> Option<usize> {
        self.slots.iter().position(|s| s.state == state)
    }

    fn vacant(&self) -> Option<usize> {
        self.position(SlotState::Empty)
            .or_else(|| self.position(SlotState::Returned))
    }

    fn transition(
        &mut self,
        index: usize,
        to: SlotState,
        direction: Option<Direction>,
        animator: &mut dyn Animator,
    ) -> Duration {
        let Some(slot) = self.slots.get_mut(index) else {
            return Duration::ZERO;
        };
        slot.state = to;
        if to != SlotState::Holding {
            slot.record = None;
        }
        match (direction, &slot.clip) {
            (Some(dir), Some(clip)) => animator.play(clip, dir, 1.0, dir.start_time()),
            _ => Duration::ZERO,
        }
    }

    fn play_held(&mut self, direction: Direction, animator: &mut dyn Animator) -> Duration {
        self.slots
            .iter()
            .rev()
            .filter(|s| s.state == SlotState::Holding)
            .filter_map(|s| s.clip.as_deref())
            .map(|clip| animator.play(clip, direction, 1.0, direction.start_time()))
            .max()
            .unwrap_or(Duration::ZERO)
    }
}
