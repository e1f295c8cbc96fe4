//! # Example: Deploy cycle
//!
//! One two-slot bay with timed clips, driven through the async runtime:
//! deploy, two captures, an overwrite prompt, then retract and save.
//!
//! Run with: `RUST_LOG=debug cargo run --example deploy_cycle --features logging`

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use samplebay::{
    Animator, DataRecord, Decision, Direction, Environment, InstrumentBuilder, InstrumentConfig,
    InstrumentError, InstrumentRuntime, LogWriter, Subscribe,
};

/// Clips take 300ms at speed 1.
struct TimedClips;

impl Animator for TimedClips {
    fn play(&mut self, clip: &str, direction: Direction, speed: f32, start: f32) -> Duration {
        println!("  clip {clip} {direction:?} from {start}");
        Duration::from_millis(300).div_f32(speed.max(0.1))
    }
}

/// Produces a numbered goo sample each time.
#[derive(Default)]
struct Launchpad {
    taken: u32,
}

impl Environment for Launchpad {
    fn capture_allowed(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Option<DataRecord> {
        self.taken += 1;
        let n = self.taken;
        Some(DataRecord::new(
            2.5 * n as f32,
            format!("goo@launchpad#{n}"),
            format!("Mystery Goo #{n}"),
        ))
    }
}

const CONFIG: &str = r#"
title = "Goo Canister"
primary_clip = "doors"
slot_clip_prefix = "sample"
capacity = 2
concurrent_limit = 2
anim_speed = 1.5
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = InstrumentConfig::from_toml_str(CONFIG)?;
    let builder =
        InstrumentBuilder::new("bay-1", config, Launchpad::default()).with_animator(TimedClips);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let runtime = InstrumentRuntime::spawn_with(builder, subs, CancellationToken::new());
    let bay = runtime.handle();

    println!("[demo] capture while retracted (deploys first)");
    println!("  -> {:?}", bay.capture(true).await?);
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("[demo] second capture");
    println!("  -> {:?}", bay.capture(true).await?);

    println!("[demo] third capture hits the concurrent limit");
    match bay.capture(true).await {
        Err(InstrumentError::CapacityConflict { limit, prompt }) => {
            println!("  limit {limit} reached, confirming prompt {prompt}");
            println!("  -> {:?}", bay.resolve_prompt(prompt, Decision::Confirm).await?);
        }
        other => println!("  unexpected: {other:?}"),
    }

    println!("[demo] retract");
    bay.toggle().await?;
    tokio::time::sleep(Duration::from_millis(800)).await;

    let status = bay.status().await?;
    println!(
        "[demo] {:?}: {} committed, {} provisional",
        status.state, status.committed, status.provisional
    );

    let saved = runtime.shutdown().await?;
    println!("[demo] saved: {}", saved.to_json()?);
    Ok(())
}
