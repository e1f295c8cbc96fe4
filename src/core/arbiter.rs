//! # Capture admission.
//!
//! [`Arbiter`] decides whether a capture may run right now. Checks run in a fixed
//! order and the first failing one wins, because each produces a different notice:
//!
//! ```text
//! 1. inoperable                    → Denied(Inoperable)
//! 2. environment refuses           → Denied(Ineligible)
//! 3. field operator, usage unmet   → Denied(UsageRequirementUnmet)
//! 4. cap > 0 && held >= cap        → NeedsConfirmation      (skipped when overwriting)
//! 5. full                          → Denied(Full)           (skipped when overwriting)
//! 6.                               → Allowed
//! ```
//!
//! A silent request is judged exactly like a loud one: silence only suppresses the
//! review after capture, never the overwrite prompt.

use crate::core::config::InstrumentConfig;
use crate::data::Ledger;
use crate::error::InstrumentError;
use crate::services::Environment;

/// Parameters of one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    /// Skip the review after capture.
    pub silent: bool,
    /// Replace an existing record instead of taking a new slot.
    pub overwrite: bool,
}

impl CaptureRequest {
    #[inline]
    pub fn new(silent: bool) -> Self {
        Self {
            silent,
            overwrite: false,
        }
    }

    /// The same request, authorized to overwrite.
    #[inline]
    pub fn overwriting(self) -> Self {
        Self {
            overwrite: true,
            ..self
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(InstrumentError),
    /// The cap is reached; the operator must confirm an overwrite.
    NeedsConfirmation { limit: usize },
}

/// Admission rules derived from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct Arbiter {
    cap: Option<usize>,
}

impl Arbiter {
    pub fn new(config: &InstrumentConfig) -> Self {
        Self {
            cap: config.concurrent_cap(),
        }
    }

    /// Evaluates `request` against the ledger and environment.
    pub fn can_capture(
        &self,
        ledger: &Ledger,
        env: &dyn Environment,
        request: CaptureRequest,
    ) -> Verdict {
        if ledger.is_inoperable() {
            return Verdict::Denied(InstrumentError::Inoperable);
        }
        if !env.capture_allowed() {
            return Verdict::Denied(InstrumentError::Ineligible);
        }
        if env.operator_in_field() {
            if let Some(message) = env.unmet_usage_requirement() {
                return Verdict::Denied(InstrumentError::UsageRequirementUnmet { message });
            }
        }
        if request.overwrite {
            return Verdict::Allowed;
        }
        if let Some(limit) = self.cap.filter(|limit| ledger.occupied() >= *limit) {
            return Verdict::NeedsConfirmation { limit };
        }
        if ledger.is_full() {
            return Verdict::Denied(InstrumentError::Full);
        }
        Verdict::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataRecord, Origin};
    use crate::testing::ScriptedEnvironment;

    fn rec(n: u32) -> DataRecord {
        DataRecord::new(1.0, format!("s{n}"), "t")
    }

    fn arbiter(limit: usize) -> Arbiter {
        Arbiter::new(&InstrumentConfig {
            concurrent_limit: limit,
            ..InstrumentConfig::default()
        })
    }

    #[test]
    fn test_empty_instrument_allows() {
        let env = ScriptedEnvironment::default();
        let ledger = Ledger::new(1, false);
        assert_eq!(
            arbiter(0).can_capture(&ledger, &env, CaptureRequest::new(false)),
            Verdict::Allowed
        );
    }

    #[test]
    fn test_inoperable_wins_over_everything() {
        let env = ScriptedEnvironment::default();
        env.set_allowed(false);
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);
        ledger.dispose(Origin::Committed, &rec(1));

        assert_eq!(
            arbiter(1).can_capture(&ledger, &env, CaptureRequest::new(true)),
            Verdict::Denied(InstrumentError::Inoperable)
        );
    }

    #[test]
    fn test_ineligible_before_usage() {
        let env = ScriptedEnvironment::default();
        env.set_allowed(false);
        env.set_field_operator(Some("needs crew".into()));
        let ledger = Ledger::new(1, false);

        assert_eq!(
            arbiter(0).can_capture(&ledger, &env, CaptureRequest::new(false)),
            Verdict::Denied(InstrumentError::Ineligible)
        );
    }

    #[test]
    fn test_usage_only_checked_for_field_operator() {
        let env = ScriptedEnvironment::default();
        let ledger = Ledger::new(1, false);
        env.set_field_operator(Some("needs crew".into()));
        assert_eq!(
            arbiter(0).can_capture(&ledger, &env, CaptureRequest::new(false)),
            Verdict::Denied(InstrumentError::UsageRequirementUnmet {
                message: "needs crew".into()
            })
        );

        env.set_field_operator(None);
        assert_eq!(
            arbiter(0).can_capture(&ledger, &env, CaptureRequest::new(false)),
            Verdict::Allowed
        );
    }

    #[test]
    fn test_cap_asks_before_full_even_when_silent() {
        let env = ScriptedEnvironment::default();
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);

        assert_eq!(
            arbiter(1).can_capture(&ledger, &env, CaptureRequest::new(true)),
            Verdict::NeedsConfirmation { limit: 1 }
        );
        assert_eq!(
            arbiter(0).can_capture(&ledger, &env, CaptureRequest::new(true)),
            Verdict::Denied(InstrumentError::Full)
        );
    }

    #[test]
    fn test_overwrite_bypasses_cap_and_full() {
        let env = ScriptedEnvironment::default();
        let mut ledger = Ledger::new(1, false);
        ledger.capture(rec(1), false);

        let request = CaptureRequest::new(false).overwriting();
        assert_eq!(
            arbiter(1).can_capture(&ledger, &env, request),
            Verdict::Allowed
        );
    }
}
