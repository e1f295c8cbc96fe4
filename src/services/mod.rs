//! External collaborators of an instrument.
//!
//! The instrument owns one boxed implementation of each seam. Hosts plug in
//! their own; the inert defaults ([`NoAnimator`], [`Headless`], [`Offline`]) make
//! a bare instrument usable with nothing but an [`Environment`].
//!
//! ```text
//! Instrument ──► Animator      play(clip, direction, speed, start) → duration
//!            ──► Environment   capture_allowed / usage / repair / sample
//!            ──► Prompt        confirm(request)        ◄── resolve_prompt(id, decision)
//!            ──► ReviewDesk    present(page)           ◄── decide(origin, record, decision)
//!            ──► Comms         best_transmitter / transmit
//!            ──► Facilities    find / process
//!            ──► Containers    field_container / exists / store
//!            ──► UiRefresh     request_refresh (best effort)
//! ```

mod animator;
mod environment;
mod external;
mod operator;

pub use animator::{Animator, Direction, NoAnimator};
pub use environment::Environment;
pub use external::{Comms, Containers, ExternalId, Facilities, Offline};
pub use operator::{
    ConfirmRequest, Decision, Headless, Prompt, ReviewDecision, ReviewDesk, ReviewPage, UiRefresh,
};

/// One implementation per collaborator seam.
pub struct Services {
    pub animator: Box<dyn Animator>,
    pub environment: Box<dyn Environment>,
    pub prompt: Box<dyn Prompt>,
    pub review: Box<dyn ReviewDesk>,
    pub comms: Box<dyn Comms>,
    pub facilities: Box<dyn Facilities>,
    pub containers: Box<dyn Containers>,
    pub ui: Box<dyn UiRefresh>,
}

impl Services {
    /// Inert defaults around the given environment.
    pub fn new(environment: impl Environment + 'static) -> Self {
        Self {
            animator: Box::new(NoAnimator),
            environment: Box::new(environment),
            prompt: Box::new(Headless),
            review: Box::new(Headless),
            comms: Box::new(Offline),
            facilities: Box::new(Offline),
            containers: Box::new(Offline),
            ui: Box::new(Headless),
        }
    }
}
