//! # Deployment controller.
//!
//! [`Instrument`] is the synchronous state machine behind one sample bay. It owns
//! the [`Ledger`], the [`SlotPool`] and every collaborator, and is driven by inbound
//! calls (`toggle`, `capture`, `resolve_prompt`, ...) plus `resume(ticket)` when a
//! scheduled wait elapses.
//!
//! ## Deployment states
//! ```text
//!              toggle / capture                 resume(DoorsOpened)
//!  Retracted ─────────────────────► Deploying ─────────────────────► Deployed
//!      ▲                              │   ▲                              │
//!      │                       toggle │   │ toggle / capture             │ toggle
//!      │ resume(DoorsClosed)          ▼   │                              ▼
//!      └─────────────────────────── Retracting ◄─────────────────────────┘
//! ```
//!
//! ## Sequences
//! ```text
//! deploy:  primary clip forward ─ wait ─► extend held slots, Deployed, run attached capture
//! retract: stow held slots ─ wait(longest) ─► primary clip reverse ─ wait ─► Retracted
//! direct:  every clip at once, no waits
//! ```
//!
//! ## Rules
//! - At most one continuation is pending; starting a sequence cancels the previous one first.
//! - The toggle control is disabled while a continuation is pending; [`Instrument::request_toggle`]
//!   refuses with `AlreadyInProgress`, [`Instrument::toggle`] always reverses.
//! - A capture issued while deploying queues on the pending deploy. When the doors are open
//!   the first queued capture runs; later ones go through admission again.
//! - Every refused operation posts a notice and leaves state untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::arbiter::{Arbiter, CaptureRequest, Verdict};
use crate::core::config::InstrumentConfig;
use crate::core::scheduler::Scheduler;
use crate::core::slots::SlotPool;
use crate::data::{Ledger, PersistedState, Placement};
use crate::error::InstrumentError;
use crate::events::{Bus, Event, EventKind, Notice};
use crate::services::{ConfirmRequest, Decision, Direction, ExternalId, Services};

/// Where the instrument is in its deploy/retract cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
    Retracted,
    Deploying,
    Deployed,
    Retracting,
}

impl DeploymentState {
    /// The persisted flag: deploying counts as deployed.
    #[inline]
    pub fn is_deployed(self) -> bool {
        matches!(self, DeploymentState::Deploying | DeploymentState::Deployed)
    }

    #[inline]
    pub fn in_transition(self) -> bool {
        matches!(self, DeploymentState::Deploying | DeploymentState::Retracting)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            DeploymentState::Retracted => "retracted",
            DeploymentState::Deploying => "deploying",
            DeploymentState::Deployed => "deployed",
            DeploymentState::Retracting => "retracting",
        }
    }
}

/// Result of an admitted capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A record was stored.
    Captured(Placement),
    /// The capture runs once the pending deploy finishes.
    Deferred,
    /// The environment produced no record; nothing changed.
    Aborted,
}

/// Result of a transfer request that was not refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred { count: usize },
    /// Handing over would use up the last capture; answer the prompt to proceed.
    AwaitingConfirmation { prompt: u64 },
}

/// What answering a prompt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Cancelled,
    Captured(CaptureOutcome),
    Transferred { count: usize },
}

/// Which operator controls are currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub toggle: bool,
    pub capture: bool,
    pub review: bool,
    pub review_provisional: bool,
    pub reset: bool,
    pub collect: bool,
    pub transfer: bool,
    pub clean_up: bool,
}

/// Point-in-time summary of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentStatus {
    pub id: Arc<str>,
    pub state: DeploymentState,
    pub direct_mode: bool,
    pub occupied: usize,
    pub returned: usize,
    pub committed: usize,
    pub provisional: usize,
    pub full: bool,
    pub inoperable: bool,
    pub controls: Controls,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    DoorsOpened { then: Vec<CaptureRequest> },
    SlotsStowed,
    DoorsClosed,
}

impl Step {
    fn as_label(&self) -> &'static str {
        match self {
            Step::DoorsOpened { .. } => "doors_opened",
            Step::SlotsStowed => "slots_stowed",
            Step::DoorsClosed => "doors_closed",
        }
    }
}

struct Pending {
    ticket: u64,
    step: Step,
    token: CancellationToken,
}

#[derive(Debug, Clone)]
pub(super) enum PromptAction {
    Overwrite(CaptureRequest),
    Transfer(ExternalId),
}

/// One sample bay: deployment, capture, and the records it holds.
pub struct Instrument {
    pub(super) id: Arc<str>,
    pub(super) config: InstrumentConfig,
    pub(super) ledger: Ledger,
    pub(super) slots: SlotPool,
    pub(super) services: Services,
    pub(super) review_open: bool,
    pub(super) prompts: HashMap<u64, PromptAction>,

    arbiter: Arbiter,
    scheduler: Box<dyn Scheduler>,
    bus: Bus,
    state: DeploymentState,
    direct_mode: bool,
    toggle_enabled: bool,
    pending: Option<Pending>,
    next_ticket: u64,
    next_prompt: u64,
    inline_capture: Option<CaptureOutcome>,
}

impl Instrument {
    pub(super) fn assemble(
        id: Arc<str>,
        config: InstrumentConfig,
        services: Services,
        scheduler: Box<dyn Scheduler>,
        bus: Bus,
        saved: Option<PersistedState>,
    ) -> Self {
        let capacity = config.capacity_clamped();
        let (ledger, deployed, direct_mode) = match saved {
            Some(s) => (
                Ledger::restore_from(
                    capacity,
                    config.rerunnable,
                    s.committed,
                    s.provisional,
                    s.returned_slots,
                    s.total_captures,
                ),
                s.is_deployed,
                s.direct_mode.unwrap_or(config.direct_mode),
            ),
            None => (Ledger::new(capacity, config.rerunnable), false, config.direct_mode),
        };
        let mut slots = SlotPool::new(&config);
        slots.load(ledger.returned(), &ledger.data());

        let mut instrument = Self {
            id,
            arbiter: Arbiter::new(&config),
            config,
            ledger,
            slots,
            services,
            review_open: false,
            prompts: HashMap::new(),
            scheduler,
            bus,
            state: if deployed {
                DeploymentState::Deployed
            } else {
                DeploymentState::Retracted
            },
            direct_mode,
            toggle_enabled: true,
            pending: None,
            next_ticket: 0,
            next_prompt: 0,
            inline_capture: None,
        };
        instrument.restore_pose();
        instrument
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn is_deployed(&self) -> bool {
        self.state.is_deployed()
    }

    pub fn is_direct_mode(&self) -> bool {
        self.direct_mode
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn slots(&self) -> &SlotPool {
        &self.slots
    }

    /// Bus every event of this instrument is published on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Ticket of the pending continuation, if a sequence is waiting.
    pub fn pending_ticket(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    /// Ids of open prompts, oldest first.
    pub fn open_prompts(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.prompts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // ---- Deployment ----

    /// Toggle as issued from the operator control.
    ///
    /// Refused with [`InstrumentError::AlreadyInProgress`] while a sequence waits.
    pub fn request_toggle(&mut self) -> Result<DeploymentState, InstrumentError> {
        if !self.toggle_enabled {
            debug!(instrument = %self.id, state = self.state.as_label(), "toggle ignored; sequence in flight");
            return Err(InstrumentError::AlreadyInProgress);
        }
        Ok(self.toggle())
    }

    /// Reverses direction: deployed or deploying retracts, anything else deploys.
    ///
    /// A pending continuation is cancelled before the new sequence starts.
    pub fn toggle(&mut self) -> DeploymentState {
        if self.state.is_deployed() {
            self.begin_retract();
        } else {
            self.begin_deploy(Vec::new());
        }
        self.state
    }

    /// Continues the sequence waiting on `ticket`.
    ///
    /// Returns `false` (and does nothing) for stale or cancelled tickets.
    pub fn resume(&mut self, ticket: u64) -> bool {
        match self.pending.take() {
            Some(p) if p.ticket == ticket && !p.token.is_cancelled() => {
                p.token.cancel();
                self.run_step(p.step);
                true
            }
            other => {
                self.pending = other;
                debug!(instrument = %self.id, ticket, "stale continuation ignored");
                false
            }
        }
    }

    /// Switches between door-sequenced and direct mode.
    pub fn toggle_direct_mode(&mut self) -> Result<bool, InstrumentError> {
        if self.pending.is_some() {
            return Err(InstrumentError::AlreadyInProgress);
        }
        self.direct_mode = !self.direct_mode;
        info!(instrument = %self.id, direct = self.direct_mode, "direct mode switched");
        self.services.ui.request_refresh();
        Ok(self.direct_mode)
    }

    fn begin_deploy(&mut self, then: Vec<CaptureRequest>) {
        self.cancel_pending();

        if self.direct_mode {
            self.slots.extend_held(self.services.animator.as_mut());
            self.play_primary(Direction::Extend);
            self.emit(Event::new(EventKind::DeployStarted));
            self.run_step(Step::DoorsOpened { then });
            return;
        }

        self.state = DeploymentState::Deploying;
        self.toggle_enabled = false;
        let after = self.play_primary(Direction::Extend);
        debug!(instrument = %self.id, delay_ms = after.as_millis() as u64, "deploy started");
        self.emit(Event::new(EventKind::DeployStarted).with_delay(after));
        self.continue_after(after, Step::DoorsOpened { then });
    }

    fn begin_retract(&mut self) {
        self.cancel_pending();

        if self.direct_mode {
            self.slots.stow_held(self.services.animator.as_mut());
            self.play_primary(Direction::Retract);
            self.emit(Event::new(EventKind::RetractStarted));
            self.run_step(Step::DoorsClosed);
            return;
        }

        self.state = DeploymentState::Retracting;
        self.toggle_enabled = false;
        let after = self.slots.stow_held(self.services.animator.as_mut());
        debug!(instrument = %self.id, delay_ms = after.as_millis() as u64, "retract started");
        self.emit(Event::new(EventKind::RetractStarted).with_delay(after));
        self.continue_after(after, Step::SlotsStowed);
    }

    fn run_step(&mut self, step: Step) {
        match step {
            Step::DoorsOpened { then } => {
                self.slots.extend_held(self.services.animator.as_mut());
                self.state = DeploymentState::Deployed;
                self.toggle_enabled = true;
                info!(instrument = %self.id, "deployed");
                self.emit(Event::new(EventKind::Deployed));
                let mut queued = then.into_iter();
                if let Some(first) = queued.next() {
                    self.run_capture(first);
                }
                // Admitted against the ledger as it was before the first capture landed.
                for request in queued {
                    if let Err(err) = self.capture_with(request) {
                        debug!(instrument = %self.id, reason = err.as_label(), "queued capture refused");
                    }
                }
            }
            Step::SlotsStowed => {
                let after = self.play_primary(Direction::Retract);
                self.continue_after(after, Step::DoorsClosed);
            }
            Step::DoorsClosed => {
                self.state = DeploymentState::Retracted;
                self.toggle_enabled = true;
                info!(instrument = %self.id, "retracted");
                self.emit(Event::new(EventKind::Retracted));
            }
        }
    }

    fn continue_after(&mut self, after: Duration, step: Step) {
        if after.is_zero() {
            self.run_step(step);
            return;
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = CancellationToken::new();
        self.scheduler.schedule(ticket, after, token.clone());
        self.pending = Some(Pending {
            ticket,
            step,
            token,
        });
    }

    pub(super) fn cancel_pending(&mut self) {
        if let Some(p) = self.pending.take() {
            p.token.cancel();
            debug!(instrument = %self.id, ticket = p.ticket, step = p.step.as_label(), "continuation cancelled");
            self.emit(Event::new(EventKind::SequenceCancelled).with_reason(p.step.as_label()));
        }
    }

    fn play_primary(&mut self, direction: Direction) -> Duration {
        match self.config.primary_clip.as_deref() {
            Some(clip) => self.services.animator.play(
                clip,
                direction,
                self.config.primary_speed(),
                direction.start_time(),
            ),
            None => Duration::ZERO,
        }
    }

    fn restore_pose(&mut self) {
        let direction = if self.state.is_deployed() {
            Direction::Extend
        } else {
            Direction::Retract
        };
        if let Some(clip) = self.config.primary_clip.as_deref() {
            self.services.animator.play(
                clip,
                direction,
                self.config.primary_speed(),
                direction.end_time(),
            );
        }
        if self.state.is_deployed() {
            self.slots
                .snap_held(Direction::Extend, self.services.animator.as_mut());
        }
    }

    // ---- Capture ----

    /// Takes a sample, deploying first when needed.
    ///
    /// `silent` skips the review page; it never skips the overwrite prompt.
    /// When the cap is reached the overwrite prompt is opened and
    /// [`InstrumentError::CapacityConflict`] carries its id.
    pub fn capture(&mut self, silent: bool) -> Result<CaptureOutcome, InstrumentError> {
        self.capture_with(CaptureRequest::new(silent))
    }

    fn capture_with(&mut self, request: CaptureRequest) -> Result<CaptureOutcome, InstrumentError> {
        let verdict =
            self.arbiter
                .can_capture(&self.ledger, self.services.environment.as_ref(), request);
        match verdict {
            Verdict::Allowed => {}
            Verdict::Denied(err) => {
                self.post_denial(&err);
                return Err(err);
            }
            Verdict::NeedsConfirmation { limit } => {
                let prompt = self.open_prompt(
                    PromptAction::Overwrite(request),
                    Notice::ConcurrentLimit { limit },
                );
                return Err(InstrumentError::CapacityConflict { limit, prompt });
            }
        }

        if self.direct_mode || self.state == DeploymentState::Deployed {
            return Ok(self.run_capture(request));
        }

        if let Some(Pending {
            step: Step::DoorsOpened { then },
            ..
        }) = self.pending.as_mut()
        {
            then.push(request);
            debug!(instrument = %self.id, queued = then.len(), "capture queued on pending deploy");
            return Ok(CaptureOutcome::Deferred);
        }

        self.inline_capture = None;
        self.begin_deploy(vec![request]);
        Ok(self
            .inline_capture
            .take()
            .unwrap_or(CaptureOutcome::Deferred))
    }

    fn run_capture(&mut self, request: CaptureRequest) -> CaptureOutcome {
        let Some(record) = self.services.environment.sample() else {
            debug!(instrument = %self.id, "environment produced no record; capture aborted");
            self.inline_capture = Some(CaptureOutcome::Aborted);
            return CaptureOutcome::Aborted;
        };

        let displaced = self.ledger.capture(record.clone(), request.overwrite);
        let (placement, slot) = match displaced {
            Some(old) => (Placement::Replaced, self.slots.rebind(&old, record.clone())),
            None => match self
                .slots
                .claim(record.clone(), self.services.animator.as_mut())
            {
                Some(slot) => (Placement::Appended { slot }, Some(slot)),
                None => (Placement::Overflow, None),
            },
        };
        let ev = Event::new(EventKind::CaptureCompleted)
            .with_subject(record.subject_id())
            .with_slot(slot);
        if self.direct_mode {
            self.state = DeploymentState::Deployed;
        }
        info!(
            instrument = %self.id,
            subject = record.subject_id(),
            overwrite = request.overwrite,
            occupied = self.ledger.occupied(),
            "capture completed"
        );
        self.emit(ev);

        let succeeded = Notice::CaptureSucceeded {
            title: self.config.title.clone(),
            amount: record.amount(),
            record_title: record.title().to_string(),
        };
        if !self.ledger.is_multi_slot() {
            if request.silent {
                self.notify(succeeded);
            } else {
                self.review_committed();
            }
        } else if request.silent {
            self.keep_provisional(&record);
            self.notify(succeeded);
        } else {
            self.review_provisional();
        }

        let outcome = CaptureOutcome::Captured(placement);
        self.inline_capture = Some(outcome);
        outcome
    }

    fn post_denial(&mut self, err: &InstrumentError) {
        let title = self.config.title.clone();
        let notice = match err {
            InstrumentError::Inoperable => Notice::Inoperable { title },
            InstrumentError::Ineligible => Notice::Ineligible { title },
            InstrumentError::UsageRequirementUnmet { message } => Notice::UsageRequirementUnmet {
                message: message.clone(),
            },
            InstrumentError::Full => Notice::Full { title },
            _ => return,
        };
        debug!(instrument = %self.id, reason = err.as_label(), "capture denied");
        self.notify(notice);
    }

    // ---- Prompts ----

    pub(super) fn open_prompt(&mut self, action: PromptAction, question: Notice) -> u64 {
        if matches!(action, PromptAction::Overwrite(_)) {
            self.prompts
                .retain(|_, a| !matches!(a, PromptAction::Overwrite(_)));
        }
        self.next_prompt += 1;
        let id = self.next_prompt;
        self.prompts.insert(id, action);

        debug!(instrument = %self.id, prompt = id, "prompt opened");
        self.emit(
            Event::new(EventKind::PromptOpened)
                .with_prompt(id)
                .with_notice(question.clone()),
        );
        self.services.prompt.confirm(ConfirmRequest {
            id,
            title: self.config.title.clone(),
            question,
        });
        id
    }

    /// Answers an open prompt.
    ///
    /// Confirming an overwrite re-runs admission with overwrite set: the
    /// inoperable, eligibility and usage checks still apply. Answering a prompt
    /// that is no longer open returns [`InstrumentError::StalePrompt`].
    pub fn resolve_prompt(
        &mut self,
        id: u64,
        decision: Decision,
    ) -> Result<Resolution, InstrumentError> {
        let Some(action) = self.prompts.remove(&id) else {
            debug!(instrument = %self.id, prompt = id, "answer to closed prompt ignored");
            return Err(InstrumentError::StalePrompt { id });
        };
        let label = match decision {
            Decision::Confirm => "confirm",
            Decision::Cancel => "cancel",
        };
        self.emit(
            Event::new(EventKind::PromptResolved)
                .with_prompt(id)
                .with_reason(label),
        );

        match (decision, action) {
            (Decision::Cancel, _) => Ok(Resolution::Cancelled),
            (Decision::Confirm, PromptAction::Overwrite(request)) => self
                .capture_with(request.overwriting())
                .map(Resolution::Captured),
            (Decision::Confirm, PromptAction::Transfer(target)) => self
                .confirm_transfer(&target)
                .map(|count| Resolution::Transferred { count }),
        }
    }

    // ---- Resets ----

    /// Clears every record without using up slots. No-op when nothing is held.
    pub fn reset_experiment(&mut self) {
        if self.ledger.occupied() == 0 {
            debug!(instrument = %self.id, "experiment reset skipped; no records");
            return;
        }
        let held = self.slots.held();
        self.ledger.reset_experiment();
        let animate = self.state == DeploymentState::Deployed;
        for slot in held.into_iter().rev() {
            if animate {
                self.slots.deactivate(slot, self.services.animator.as_mut());
            } else {
                self.slots.release(slot);
            }
        }
        info!(instrument = %self.id, "experiment reset");
        self.emit(Event::new(EventKind::ExperimentReset));
    }

    /// Full reset after an outside repair: records, counters, flags and slot clips.
    pub fn reset_external(&mut self) {
        self.ledger.reset_external();
        self.slots.reset(self.services.animator.as_mut());
        info!(instrument = %self.id, "external reset");
        self.emit(Event::new(EventKind::ExternalReset));
    }

    /// Repair by an operator in the field.
    pub fn clean_up_external(&mut self) -> Result<(), InstrumentError> {
        let env = self.services.environment.as_ref();
        let qualified =
            self.config.resettable_in_field && env.operator_in_field() && env.operator_can_repair();
        let title = self.config.title.clone();
        if !qualified {
            self.notify(Notice::RepairNotQualified { title });
            return Err(InstrumentError::RepairNotQualified);
        }
        self.reset_external();
        self.notify(Notice::RepairCompleted { title });
        Ok(())
    }

    // ---- Introspection ----

    pub fn controls(&self) -> Controls {
        let idle = !self.review_open;
        let ledger = &self.ledger;
        let has_committed = !ledger.committed().is_empty();
        Controls {
            toggle: self.toggle_enabled && (!self.direct_mode || ledger.occupied() > 0),
            capture: idle && !ledger.is_inoperable(),
            review: idle && has_committed,
            review_provisional: idle && !ledger.provisional().is_empty(),
            reset: idle && ledger.occupied() > 0,
            collect: self.config.collectable && has_committed,
            transfer: self.config.collectable && has_committed,
            clean_up: idle && ledger.is_inoperable() && self.config.resettable_in_field,
        }
    }

    pub fn status(&self) -> InstrumentStatus {
        InstrumentStatus {
            id: self.id.clone(),
            state: self.state,
            direct_mode: self.direct_mode,
            occupied: self.ledger.occupied(),
            returned: self.ledger.returned(),
            committed: self.ledger.committed().len(),
            provisional: self.ledger.provisional().len(),
            full: self.ledger.is_full(),
            inoperable: self.ledger.is_inoperable(),
            controls: self.controls(),
        }
    }

    /// State to save.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            is_deployed: self.state.is_deployed(),
            direct_mode: Some(self.direct_mode),
            returned_slots: self.ledger.returned(),
            total_captures: self.ledger.total_captures(),
            committed: self.ledger.committed().to_vec(),
            provisional: self.ledger.provisional().to_vec(),
        }
    }

    // ---- Notifications ----

    pub(super) fn notify(&mut self, notice: Notice) {
        info!(instrument = %self.id, %notice, "notice");
        self.emit(Event::new(EventKind::NoticePosted).with_notice(notice));
    }

    pub(super) fn emit(&mut self, ev: Event) {
        self.bus.publish(ev.with_instrument(self.id.clone()));
        self.services.ui.request_refresh();
    }
}

impl Drop for Instrument {
    fn drop(&mut self) {
        if let Some(p) = &self.pending {
            p.token.cancel();
        }
    }
}
