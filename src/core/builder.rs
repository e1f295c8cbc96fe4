use std::sync::Arc;

use crate::{
    core::{InstrumentConfig, ManualScheduler, Scheduler},
    data::PersistedState,
    events::Bus,
    services::{
        Animator, Comms, Containers, Environment, Facilities, Prompt, ReviewDesk, Services,
        UiRefresh,
    },
};

use super::instrument::Instrument;

/// Builder for constructing an [`Instrument`] with optional collaborators.
///
/// Only the environment is mandatory; every other seam defaults to an inert
/// implementation (instant clips, headless operator, nothing reachable).
pub struct InstrumentBuilder {
    id: Arc<str>,
    config: InstrumentConfig,
    services: Services,
    scheduler: Option<Box<dyn Scheduler>>,
    bus: Option<Bus>,
    saved: Option<PersistedState>,
}

impl InstrumentBuilder {
    /// Creates a new builder for instrument `id`.
    pub fn new(
        id: impl Into<Arc<str>>,
        config: InstrumentConfig,
        environment: impl Environment + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            services: Services::new(environment),
            scheduler: None,
            bus: None,
            saved: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_animator(mut self, animator: impl Animator + 'static) -> Self {
        self.services.animator = Box::new(animator);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Prompt + 'static) -> Self {
        self.services.prompt = Box::new(prompt);
        self
    }

    pub fn with_review_desk(mut self, desk: impl ReviewDesk + 'static) -> Self {
        self.services.review = Box::new(desk);
        self
    }

    pub fn with_comms(mut self, comms: impl Comms + 'static) -> Self {
        self.services.comms = Box::new(comms);
        self
    }

    pub fn with_facilities(mut self, facilities: impl Facilities + 'static) -> Self {
        self.services.facilities = Box::new(facilities);
        self
    }

    pub fn with_containers(mut self, containers: impl Containers + 'static) -> Self {
        self.services.containers = Box::new(containers);
        self
    }

    pub fn with_ui(mut self, ui: impl UiRefresh + 'static) -> Self {
        self.services.ui = Box::new(ui);
        self
    }

    /// Sets the scheduler for timed continuations.
    ///
    /// Defaults to a [`ManualScheduler`]: the host resumes pending tickets itself.
    /// The async runtime installs its own.
    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    /// Publishes into an existing bus instead of a private one.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Bus the built instrument will publish on, created now if none was set.
    pub(super) fn ensure_bus(&mut self) -> Bus {
        let capacity = self.config.bus_capacity_clamped();
        self.bus.get_or_insert_with(|| Bus::new(capacity)).clone()
    }

    /// Starts from saved state instead of an empty, retracted instrument.
    pub fn with_state(mut self, state: PersistedState) -> Self {
        self.saved = Some(state);
        self
    }

    /// Builds the instrument.
    ///
    /// Clips are put into the pose matching the loaded state; nothing is waited on.
    pub fn build(self) -> Instrument {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.config.bus_capacity_clamped()));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Box::new(ManualScheduler::new()));
        Instrument::assemble(
            self.id,
            self.config,
            self.services,
            scheduler,
            bus,
            self.saved,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeploymentState;
    use crate::testing::{ScriptedEnvironment, rec};

    #[test]
    fn test_defaults_make_a_usable_instrument() {
        let mut inst =
            InstrumentBuilder::new("bay", InstrumentConfig::default(), ScriptedEnvironment::default())
                .build();
        assert_eq!(inst.id(), "bay");
        assert!(inst.capture(true).is_ok());
        assert_eq!(inst.state(), DeploymentState::Deployed);
    }

    #[test]
    fn test_saved_state_wins_over_config_direct_mode() {
        let config = InstrumentConfig {
            direct_mode: true,
            capacity: 2,
            ..InstrumentConfig::default()
        };
        let state = PersistedState {
            direct_mode: Some(false),
            provisional: vec![rec(1)],
            ..PersistedState::default()
        };
        let inst = InstrumentBuilder::new("bay", config, ScriptedEnvironment::default())
            .with_state(state)
            .build();
        assert!(!inst.is_direct_mode());
        assert_eq!(inst.ledger().provisional(), &[rec(1)]);
        assert_eq!(inst.state(), DeploymentState::Retracted);
    }

    #[test]
    fn test_save_load_round_trip() {
        let env = ScriptedEnvironment::default();
        let config = InstrumentConfig {
            capacity: 3,
            ..InstrumentConfig::default()
        };
        let mut inst = InstrumentBuilder::new("bay", config.clone(), env.clone()).build();
        inst.capture(true).unwrap();
        inst.capture(false).unwrap();
        let saved = inst.snapshot();

        let json = saved.to_json().unwrap();
        let loaded = InstrumentBuilder::new("bay", config, env)
            .with_state(PersistedState::from_json(&json).unwrap())
            .build();
        assert_eq!(loaded.snapshot(), saved);
        assert_eq!(loaded.data(), inst.data());
    }
}
