//! # Instrument registry: many bays on one bus.
//!
//! [`InstrumentRegistry`] owns one [`InstrumentRuntime`] per instrument id. Every
//! instrument it spawns publishes into the registry's shared bus, and gets a
//! child of the registry token so that [`InstrumentRegistry::shutdown_all`] stops
//! them together.
//!
//! ```text
//! register(builder) ──► InstrumentRuntime (child token) ──► InstrumentRegistered
//! deregister(id)    ──► runtime.shutdown()              ──► InstrumentRemoved
//! ```
//!
//! ## Rules
//! - Ids are unique; registering a duplicate is refused and nothing is spawned.
//! - Removal returns the instrument's final [`PersistedState`] for saving, or
//!   [`RegistryError::Stopped`] when the task died and no state can be trusted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::runtime::{InstrumentHandle, InstrumentRuntime};
use crate::core::InstrumentBuilder;
use crate::data::PersistedState;
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Registry of running instruments sharing one bus.
pub struct InstrumentRegistry {
    instruments: RwLock<HashMap<String, InstrumentRuntime>>,
    bus: Bus,
    token: CancellationToken,
}

impl InstrumentRegistry {
    pub fn new(bus: Bus, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            instruments: RwLock::new(HashMap::new()),
            bus,
            token,
        })
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Spawns the instrument on the shared bus and registers it under its id.
    pub async fn register(
        &self,
        builder: InstrumentBuilder,
    ) -> Result<InstrumentHandle, RegistryError> {
        self.register_with(builder, Vec::new()).await
    }

    /// Like [`register`](Self::register), with subscribers that only receive this
    /// instrument's events and stop with it.
    pub async fn register_with(
        &self,
        builder: InstrumentBuilder,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<InstrumentHandle, RegistryError> {
        let id = builder.id().to_string();
        let mut instruments = self.instruments.write().await;
        if instruments.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered { id });
        }

        let runtime = InstrumentRuntime::spawn_with(
            builder.with_bus(self.bus.clone()),
            subscribers,
            self.token.child_token(),
        );
        let handle = runtime.handle();
        instruments.insert(id.clone(), runtime);
        drop(instruments);

        self.bus
            .publish(Event::new(EventKind::InstrumentRegistered).with_instrument(id));
        Ok(handle)
    }

    pub async fn get(&self, id: &str) -> Result<InstrumentHandle, RegistryError> {
        self.instruments
            .read()
            .await
            .get(id)
            .map(InstrumentRuntime::handle)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Stops the instrument and returns its state to save.
    pub async fn deregister(&self, id: &str) -> Result<PersistedState, RegistryError> {
        let runtime = self
            .instruments
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        self.stop(id, runtime).await
    }

    /// Returns sorted list of registered ids.
    pub async fn list(&self) -> Vec<String> {
        let instruments = self.instruments.read().await;
        let mut ids: Vec<String> = instruments.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn is_empty(&self) -> bool {
        self.instruments.read().await.is_empty()
    }

    /// Stops every instrument; returns `(id, result)` pairs sorted by id.
    pub async fn shutdown_all(&self) -> Vec<(String, Result<PersistedState, RegistryError>)> {
        let mut drained: Vec<(String, InstrumentRuntime)> = {
            let mut instruments = self.instruments.write().await;
            instruments.drain().collect()
        };
        drained.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut saved = Vec::with_capacity(drained.len());
        for (id, runtime) in drained {
            let state = self.stop(&id, runtime).await;
            saved.push((id, state));
        }
        saved
    }

    async fn stop(
        &self,
        id: &str,
        runtime: InstrumentRuntime,
    ) -> Result<PersistedState, RegistryError> {
        let state = runtime.shutdown().await.map_err(|e| {
            warn!(instrument = id, error = e.as_label(), "instrument stopped abnormally");
            RegistryError::Stopped { id: id.to_string() }
        });
        self.bus
            .publish(Event::new(EventKind::InstrumentRemoved).with_instrument(id));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeploymentState, InstrumentConfig};
    use crate::error::InstrumentError;
    use crate::testing::ScriptedEnvironment;

    fn builder(id: &str) -> InstrumentBuilder {
        InstrumentBuilder::new(id, InstrumentConfig::default(), ScriptedEnvironment::default())
    }

    #[tokio::test]
    async fn test_register_get_and_list() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let reg = InstrumentRegistry::new(bus, CancellationToken::new());

        reg.register(builder("b")).await.unwrap();
        reg.register(builder("a")).await.unwrap();
        assert_eq!(reg.list().await, vec!["a", "b"]);

        let h = reg.get("a").await.unwrap();
        assert_eq!(h.id(), "a");
        assert_eq!(h.toggle().await, Ok(DeploymentState::Deployed));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::InstrumentRegistered);
        assert_eq!(ev.instrument.as_deref(), Some("b"));
        reg.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_duplicate_id_is_refused() {
        let reg = InstrumentRegistry::new(Bus::new(16), CancellationToken::new());
        reg.register(builder("a")).await.unwrap();
        assert_eq!(
            reg.register(builder("a")).await.unwrap_err(),
            RegistryError::AlreadyRegistered { id: "a".into() }
        );
        assert_eq!(reg.list().await.len(), 1);
        reg.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_deregister_returns_state_and_closes_handle() {
        let reg = InstrumentRegistry::new(Bus::new(16), CancellationToken::new());
        let h = reg.register(builder("a")).await.unwrap();
        h.capture(true).await.unwrap();

        let saved = reg.deregister("a").await.unwrap();
        assert_eq!(saved.committed.len(), 1);
        assert!(reg.is_empty().await);
        assert_eq!(h.status().await.unwrap_err(), InstrumentError::Closed);
        assert_eq!(
            reg.deregister("a").await.unwrap_err(),
            RegistryError::NotFound { id: "a".into() }
        );
    }

    #[tokio::test]
    async fn test_shutdown_all_saves_everything_in_id_order() {
        let reg = InstrumentRegistry::new(Bus::new(16), CancellationToken::new());
        reg.register(builder("z")).await.unwrap();
        reg.register(builder("m")).await.unwrap().toggle().await.unwrap();

        let saved = reg.shutdown_all().await;
        let ids: Vec<&str> = saved.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["m", "z"]);
        assert!(saved[0].1.as_ref().unwrap().is_deployed);
        assert!(!saved[1].1.as_ref().unwrap().is_deployed);
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_instrument_reports_lost_state() {
        let reg = InstrumentRegistry::new(Bus::new(16), CancellationToken::new());
        let h = reg.register(builder("a")).await.unwrap();
        reg.register(builder("b")).await.unwrap();
        h.capture(true).await.unwrap();

        let crashed = h.call::<(), _>(|_| panic!("instrument task crashed")).await;
        assert_eq!(crashed, Err(InstrumentError::Closed));

        assert_eq!(
            reg.deregister("a").await.unwrap_err(),
            RegistryError::Stopped { id: "a".into() }
        );
        assert!(reg.get("a").await.is_err());

        let saved = reg.shutdown_all().await;
        assert_eq!(saved.len(), 1);
        assert!(saved[0].1.is_ok(), "healthy instruments still save");
    }
}
