//! # Operator-facing seams: confirmation prompts, review pages, UI refresh.
//!
//! Prompts are asynchronous from the instrument's point of view: `confirm` only
//! opens the question, and the answer arrives later through
//! `Instrument::resolve_prompt(id, decision)`. Review pages work the same way with
//! `Instrument::decide`.

use std::sync::Arc;

use crate::data::{DataRecord, Origin};
use crate::events::Notice;

/// Answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// An open yes/no question.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    /// Id to answer with.
    pub id: u64,
    /// Instrument title, for the dialog caption.
    pub title: Arc<str>,
    /// The question.
    pub question: Notice,
}

/// One record presented for an operator decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub record: DataRecord,
    pub origin: Origin,
    /// Disposing of this record uses up the last capture.
    pub last_capture_warning: bool,
}

/// What the operator decided about a reviewed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Discard,
    Keep,
    Transmit,
    Relay,
}

/// Presents confirmation dialogs.
pub trait Prompt: Send {
    fn confirm(&mut self, request: ConfirmRequest);
}

/// Presents review pages.
pub trait ReviewDesk: Send {
    fn present(&mut self, page: ReviewPage);
}

/// Best-effort request to redraw whatever shows the instrument.
pub trait UiRefresh: Send {
    fn request_refresh(&mut self) {}
}

/// Operator seams for hosts without a UI. Questions and pages are dropped;
/// answers can still be fed in by id.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Prompt for Headless {
    fn confirm(&mut self, _request: ConfirmRequest) {}
}

impl ReviewDesk for Headless {
    fn present(&mut self, _page: ReviewPage) {}
}

impl UiRefresh for Headless {}
