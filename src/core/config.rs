//! # Instrument configuration.
//!
//! Provides [`InstrumentConfig`], the static description of one instrument: its
//! clips, slot count, capture cap, and rerun policy. Dynamic state (deployment
//! flag, counters, records) lives in [`PersistedState`](crate::PersistedState).
//!
//! ## Sentinel values
//! - `concurrent_limit = 0` → no cap (no overwrite prompt)
//! - `capacity = 0` → treated as 1
//! - `primary_clip = None` → no doors; captures never wait for a deploy
//!
//! ## Example
//! ```rust
//! use samplebay::InstrumentConfig;
//!
//! let cfg = InstrumentConfig::from_toml_str(r#"
//!     title = "Goo Canister"
//!     primary_clip = "doors"
//!     slot_clip_prefix = "sample"
//!     capacity = 3
//!     concurrent_limit = 2
//! "#).unwrap();
//!
//! assert_eq!(cfg.concurrent_cap(), Some(2));
//! assert_eq!(cfg.slot_clip(0).as_deref(), Some("sample1"));
//! ```

use std::sync::Arc;

use serde::Deserialize;

use crate::error::PersistError;

/// Static configuration of one instrument.
///
/// ## Field semantics
/// - `title`: display title used in notices (opaque)
/// - `primary_clip`: deploy clip played by the door sequence
/// - `slot_clip_prefix`: per-slot clips are named `{prefix}{index + 1}`
/// - `capacity`: number of sample slots (min 1; 1 = single-slot mode)
/// - `concurrent_limit`: records held before a capture asks to overwrite (`0` = no cap)
/// - `anim_speed`: speed multiplier for the primary clip
/// - `direct_mode`: bypass the door sequence (default when nothing is persisted)
/// - `rerunnable`: captures stay possible after every slot was returned
/// - `collectable`: committed data can be collected/transferred
/// - `resettable_in_field`: field operators may repair a spent instrument
/// - `bus_capacity`: event bus ring buffer size
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub title: Arc<str>,
    pub primary_clip: Option<String>,
    pub slot_clip_prefix: Option<String>,
    pub capacity: usize,
    pub concurrent_limit: usize,
    pub anim_speed: f32,
    pub direct_mode: bool,
    pub rerunnable: bool,
    pub collectable: bool,
    pub resettable_in_field: bool,
    pub bus_capacity: usize,
}

impl InstrumentConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, PersistError> {
        Ok(toml::from_str(s)?)
    }

    /// Slot count clamped to a minimum of 1.
    #[inline]
    pub fn capacity_clamped(&self) -> usize {
        self.capacity.max(1)
    }

    #[inline]
    pub fn is_multi_slot(&self) -> bool {
        self.capacity_clamped() > 1
    }

    /// Returns the concurrent-capture cap as an `Option`.
    ///
    /// - `None` → no cap
    /// - `Some(n)` → holding `n` records makes the next capture ask to overwrite
    #[inline]
    pub fn concurrent_cap(&self) -> Option<usize> {
        if self.concurrent_limit == 0 {
            None
        } else {
            Some(self.concurrent_limit)
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Primary clip speed; non-finite or non-positive values fall back to 1.
    #[inline]
    pub fn primary_speed(&self) -> f32 {
        if self.anim_speed.is_finite() && self.anim_speed > 0.0 {
            self.anim_speed
        } else {
            1.0
        }
    }

    /// Clip name for slot `index`, if slot clips are configured.
    pub fn slot_clip(&self, index: usize) -> Option<String> {
        self.slot_clip_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}{}", index + 1))
    }
}

impl Default for InstrumentConfig {
    /// Default configuration:
    ///
    /// - single slot, no cap, no clips (every transition is instant)
    /// - `anim_speed = 1.0`
    /// - not rerunnable, collectable, resettable in the field
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            title: Arc::from("Experiment"),
            primary_clip: None,
            slot_clip_prefix: None,
            capacity: 1,
            concurrent_limit: 0,
            anim_speed: 1.0,
            direct_mode: false,
            rerunnable: false,
            collectable: true,
            resettable_in_field: true,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let cfg = InstrumentConfig {
            capacity: 0,
            anim_speed: f32::NAN,
            bus_capacity: 0,
            ..InstrumentConfig::default()
        };
        assert_eq!(cfg.capacity_clamped(), 1);
        assert!(!cfg.is_multi_slot());
        assert_eq!(cfg.concurrent_cap(), None);
        assert_eq!(cfg.primary_speed(), 1.0);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_empty_prefix_means_no_slot_clips() {
        let cfg = InstrumentConfig {
            slot_clip_prefix: Some(String::new()),
            ..InstrumentConfig::default()
        };
        assert_eq!(cfg.slot_clip(0), None);
    }

    #[test]
    fn test_toml_keeps_defaults_for_missing_keys() {
        let cfg = InstrumentConfig::from_toml_str("capacity = 4\nrerunnable = true").unwrap();
        assert_eq!(cfg.capacity, 4);
        assert!(cfg.rerunnable);
        assert_eq!(&*cfg.title, "Experiment");
        assert!(cfg.collectable);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = InstrumentConfig::from_toml_str("capacity = \"many\"").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }
}
