//! Scripted collaborators shared by the unit tests.
//!
//! Every fake is `Clone` over shared state: one clone goes into the instrument,
//! the test keeps the other to script behavior and inspect calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::core::{Instrument, InstrumentBuilder, InstrumentConfig, ManualScheduler};
use crate::data::{DataRecord, PersistedState};
use crate::events::{Bus, Event, EventKind, Notice};
use crate::services::{
    Animator, Comms, ConfirmRequest, Containers, Direction, Environment, ExternalId, Facilities,
    Prompt, ReviewDesk, ReviewPage, UiRefresh,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Canonical record number `n`, as produced by [`ScriptedEnvironment`].
pub fn rec(n: u32) -> DataRecord {
    DataRecord::new(n as f32, format!("subject-{n}"), format!("Sample {n}")).with_source(n)
}

// ---- Animator ----

#[derive(Default)]
struct AnimatorLog {
    lengths: HashMap<String, Duration>,
    plays: Vec<(String, Direction, f32)>,
    speeds: Vec<f32>,
}

#[derive(Clone, Default)]
pub struct RecordingAnimator {
    inner: Arc<Mutex<AnimatorLog>>,
}

impl RecordingAnimator {
    pub fn with_length(self, clip: &str, length: Duration) -> Self {
        lock(&self.inner).lengths.insert(clip.to_string(), length);
        self
    }

    /// `(clip, direction, start)` of every play, in order.
    pub fn plays(&self) -> Vec<(String, Direction, f32)> {
        lock(&self.inner).plays.clone()
    }

    pub fn speeds(&self) -> Vec<f32> {
        lock(&self.inner).speeds.clone()
    }

    pub fn clear(&self) {
        let mut log = lock(&self.inner);
        log.plays.clear();
        log.speeds.clear();
    }
}

impl Animator for RecordingAnimator {
    fn play(&mut self, clip: &str, direction: Direction, speed: f32, start: f32) -> Duration {
        let mut log = lock(&self.inner);
        log.plays.push((clip.to_string(), direction, start));
        log.speeds.push(speed);
        log.lengths.get(clip).copied().unwrap_or(Duration::ZERO)
    }
}

// ---- Environment ----

struct EnvState {
    allowed: bool,
    in_field: bool,
    usage: Option<String>,
    can_repair: bool,
    sample_fails: bool,
    sampled: u32,
}

#[derive(Clone)]
pub struct ScriptedEnvironment {
    inner: Arc<Mutex<EnvState>>,
}

impl Default for ScriptedEnvironment {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EnvState {
                allowed: true,
                in_field: false,
                usage: None,
                can_repair: false,
                sample_fails: false,
                sampled: 0,
            })),
        }
    }
}

impl ScriptedEnvironment {
    pub fn set_allowed(&self, allowed: bool) {
        lock(&self.inner).allowed = allowed;
    }

    /// `Some(message)`: a field operator who misses a requirement. `None`: nobody in the field.
    pub fn set_field_operator(&self, unmet: Option<String>) {
        let mut s = lock(&self.inner);
        s.in_field = unmet.is_some();
        s.usage = unmet;
    }

    /// A field operator with every requirement met.
    pub fn set_in_field(&self, in_field: bool) {
        let mut s = lock(&self.inner);
        s.in_field = in_field;
        s.usage = None;
    }

    pub fn set_can_repair(&self, can_repair: bool) {
        lock(&self.inner).can_repair = can_repair;
    }

    pub fn set_sample_fails(&self, fails: bool) {
        lock(&self.inner).sample_fails = fails;
    }

    /// Number of records produced so far.
    pub fn sampled(&self) -> u32 {
        lock(&self.inner).sampled
    }
}

impl Environment for ScriptedEnvironment {
    fn capture_allowed(&self) -> bool {
        lock(&self.inner).allowed
    }

    fn operator_in_field(&self) -> bool {
        lock(&self.inner).in_field
    }

    fn unmet_usage_requirement(&self) -> Option<String> {
        lock(&self.inner).usage.clone()
    }

    fn operator_can_repair(&self) -> bool {
        lock(&self.inner).can_repair
    }

    fn sample(&mut self) -> Option<DataRecord> {
        let mut s = lock(&self.inner);
        if s.sample_fails {
            return None;
        }
        s.sampled += 1;
        Some(rec(s.sampled))
    }
}

// ---- Operator ----

#[derive(Clone, Default)]
pub struct RecordingPrompt {
    requests: Arc<Mutex<Vec<ConfirmRequest>>>,
}

impl RecordingPrompt {
    pub fn requests(&self) -> Vec<ConfirmRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_id(&self) -> Option<u64> {
        lock(&self.requests).last().map(|r| r.id)
    }
}

impl Prompt for RecordingPrompt {
    fn confirm(&mut self, request: ConfirmRequest) {
        lock(&self.requests).push(request);
    }
}

#[derive(Clone, Default)]
pub struct RecordingDesk {
    pages: Arc<Mutex<Vec<ReviewPage>>>,
}

impl RecordingDesk {
    pub fn pages(&self) -> Vec<ReviewPage> {
        lock(&self.pages).clone()
    }

    pub fn clear(&self) {
        lock(&self.pages).clear();
    }
}

impl ReviewDesk for RecordingDesk {
    fn present(&mut self, page: ReviewPage) {
        lock(&self.pages).push(page);
    }
}

#[derive(Clone, Default)]
pub struct CountingUi {
    refreshes: Arc<Mutex<usize>>,
}

impl CountingUi {
    pub fn refreshes(&self) -> usize {
        *lock(&self.refreshes)
    }
}

impl UiRefresh for CountingUi {
    fn request_refresh(&mut self) {
        *lock(&self.refreshes) += 1;
    }
}

// ---- Hand-off ----

#[derive(Default)]
struct CommsState {
    transmitter: Option<ExternalId>,
    network: bool,
    sent: Vec<(ExternalId, Vec<DataRecord>)>,
}

#[derive(Clone, Default)]
pub struct FakeComms {
    inner: Arc<Mutex<CommsState>>,
}

impl FakeComms {
    pub fn set_transmitter(&self, id: Option<&str>) {
        lock(&self.inner).transmitter = id.map(ExternalId::from);
    }

    pub fn set_network(&self, enabled: bool) {
        lock(&self.inner).network = enabled;
    }

    pub fn sent(&self) -> Vec<(ExternalId, Vec<DataRecord>)> {
        lock(&self.inner).sent.clone()
    }
}

impl Comms for FakeComms {
    fn best_transmitter(&self) -> Option<ExternalId> {
        lock(&self.inner).transmitter.clone()
    }

    fn network_enabled(&self) -> bool {
        lock(&self.inner).network
    }

    fn transmit(&mut self, via: &ExternalId, records: Vec<DataRecord>) {
        lock(&self.inner).sent.push((via.clone(), records));
    }
}

struct FacilityState {
    found: Result<ExternalId, String>,
    processed: Vec<(ExternalId, DataRecord)>,
}

#[derive(Clone)]
pub struct FakeFacilities {
    inner: Arc<Mutex<FacilityState>>,
}

impl Default for FakeFacilities {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FacilityState {
                found: Err("no lab in range".to_string()),
                processed: Vec::new(),
            })),
        }
    }
}

impl FakeFacilities {
    pub fn set_found(&self, found: Result<&str, &str>) {
        lock(&self.inner).found = found.map(ExternalId::from).map_err(str::to_string);
    }

    pub fn processed(&self) -> Vec<(ExternalId, DataRecord)> {
        lock(&self.inner).processed.clone()
    }
}

impl Facilities for FakeFacilities {
    fn find(&self, _record: &DataRecord) -> Result<ExternalId, String> {
        lock(&self.inner).found.clone()
    }

    fn process(&mut self, facility: &ExternalId, record: DataRecord) {
        lock(&self.inner).processed.push((facility.clone(), record));
    }
}

struct ContainerState {
    field: Option<ExternalId>,
    known: HashSet<ExternalId>,
    accept: bool,
    stored: Vec<(ExternalId, Vec<DataRecord>)>,
}

#[derive(Clone)]
pub struct FakeContainers {
    inner: Arc<Mutex<ContainerState>>,
}

impl Default for FakeContainers {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ContainerState {
                field: None,
                known: HashSet::new(),
                accept: true,
                stored: Vec::new(),
            })),
        }
    }
}

impl FakeContainers {
    pub fn set_field_container(&self, id: Option<&str>) {
        lock(&self.inner).field = id.map(ExternalId::from);
    }

    pub fn add(&self, id: &str) {
        lock(&self.inner).known.insert(ExternalId::from(id));
    }

    pub fn set_accept(&self, accept: bool) {
        lock(&self.inner).accept = accept;
    }

    pub fn stored(&self) -> Vec<(ExternalId, Vec<DataRecord>)> {
        lock(&self.inner).stored.clone()
    }
}

impl Containers for FakeContainers {
    fn field_container(&self) -> Option<ExternalId> {
        lock(&self.inner).field.clone()
    }

    fn exists(&self, id: &ExternalId) -> bool {
        lock(&self.inner).known.contains(id)
    }

    fn store(&mut self, id: &ExternalId, records: &[DataRecord]) -> bool {
        let mut s = lock(&self.inner);
        if !s.accept {
            return false;
        }
        s.stored.push((id.clone(), records.to_vec()));
        true
    }
}

// ---- Rig ----

/// Test-side handles to every fake wired into an instrument.
pub struct Rig {
    pub animator: RecordingAnimator,
    pub env: ScriptedEnvironment,
    pub prompt: RecordingPrompt,
    pub desk: RecordingDesk,
    pub comms: FakeComms,
    pub facilities: FakeFacilities,
    pub containers: FakeContainers,
    pub ui: CountingUi,
    pub scheduler: ManualScheduler,
    events: broadcast::Receiver<Event>,
}

impl Rig {
    pub fn new(animator: RecordingAnimator) -> Self {
        Self {
            animator,
            env: ScriptedEnvironment::default(),
            prompt: RecordingPrompt::default(),
            desk: RecordingDesk::default(),
            comms: FakeComms::default(),
            facilities: FakeFacilities::default(),
            containers: FakeContainers::default(),
            ui: CountingUi::default(),
            scheduler: ManualScheduler::new(),
            events: Bus::new(1).subscribe(),
        }
    }

    /// Wires clones of every fake into a builder.
    pub fn builder(&mut self, config: InstrumentConfig) -> InstrumentBuilder {
        let bus = Bus::new(256);
        self.events = bus.subscribe();
        InstrumentBuilder::new("bay-1", config, self.env.clone())
            .with_animator(self.animator.clone())
            .with_prompt(self.prompt.clone())
            .with_review_desk(self.desk.clone())
            .with_comms(self.comms.clone())
            .with_facilities(self.facilities.clone())
            .with_containers(self.containers.clone())
            .with_ui(self.ui.clone())
            .with_scheduler(self.scheduler.clone())
            .with_bus(bus)
    }

    /// Events published since the last call.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }

    pub fn kinds(&mut self) -> Vec<EventKind> {
        self.drain().into_iter().map(|e| e.kind).collect()
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        self.drain().into_iter().filter_map(|e| e.notice).collect()
    }
}

/// Instrument with instant clips and recording fakes.
pub fn rig(config: InstrumentConfig) -> (Instrument, Rig) {
    rig_with(config, RecordingAnimator::default(), None)
}

/// Instrument with the given animator and optional saved state.
pub fn rig_with(
    config: InstrumentConfig,
    animator: RecordingAnimator,
    saved: Option<PersistedState>,
) -> (Instrument, Rig) {
    let mut rig = Rig::new(animator);
    let mut builder = rig.builder(config);
    if let Some(state) = saved {
        builder = builder.with_state(state);
    }
    (builder.build(), rig)
}

/// Multi-slot config with door and slot clips.
pub fn bay(capacity: usize) -> InstrumentConfig {
    InstrumentConfig {
        title: Arc::from("Goo"),
        primary_clip: Some("doors".into()),
        slot_clip_prefix: Some("sample".into()),
        capacity,
        ..InstrumentConfig::default()
    }
}
