//! Pivot script runner
//!
//! Usage: `pivot-runner <script> [scene.json]`
//!
//! For example `pivot-runner demos/arena.pivot demos/arena.json`.
//!
//! This binary:
//! 1. Loads the script into fresh indexes
//! 2. Creates a scene with every loaded system and the entities of the scene file
//! 3. Sends the events listed in the scene file, in order
//! 4. Logs the resulting scene as JSON
//!
//! Environment:
//! - `PIVOT_MAX_CASCADE_DEPTH` - follow-up generations allowed per send (default 32)
//! - `PIVOT_MAX_EVENTS` - events processed per send (default 4096)
//! - `PIVOT_STEP_BUDGET` - statements per system run, `0` for unbounded (default 1000000)
//! - `RUST_LOG` - log filter

mod scene_file;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use eyre::{OptionExt, WrapErr, bail};
use pivot_data::Value;
use pivot_ecs::{DispatchConfig, Indexes, Scene};
use pivot_script::{Engine, InterpreterConfig};
use tracing::{info, warn};

use crate::scene_file::{SceneFile, ScriptedEvent};

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pivot_runner=info".parse()?)
                .add_directive("pivot_script=info".parse()?)
                .add_directive("pivot::script=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(script) = args.get(1).map(PathBuf::from) else {
        bail!("usage: pivot-runner <script> [scene.json]");
    };
    let scene_file = match args.get(2) {
        Some(path) => Some(SceneFile::read(Path::new(path))?),
        None => None,
    };

    let defaults = DispatchConfig::default();
    let dispatch = DispatchConfig {
        max_cascade_depth: env_or("PIVOT_MAX_CASCADE_DEPTH", defaults.max_cascade_depth),
        max_events: env_or("PIVOT_MAX_EVENTS", defaults.max_events),
    };
    let step_budget = match env_or("PIVOT_STEP_BUDGET", 1_000_000_u64) {
        0 => None,
        budget => Some(budget),
    };
    info!(?dispatch, ?step_budget, "configuration");

    let engine = Engine::new().with_config(InterpreterConfig { step_budget });
    let mut indexes = Indexes::new();
    let summary = engine
        .load_file(&script, &mut indexes)
        .wrap_err_with(|| format!("failed to load {}", script.display()))?;
    info!(
        components = ?summary.components,
        events = ?summary.events,
        systems = ?summary.systems,
        "script registered"
    );

    let name = scene_file
        .as_ref()
        .map_or("main", |file| file.snapshot.name.as_str());
    let mut scene = Scene::with_config(name, dispatch);
    for system in indexes.systems.names() {
        scene.register_system(system, &indexes)?;
    }

    if let Some(file) = &scene_file {
        let created = scene.load_snapshot(&file.snapshot, &indexes.components)?;
        info!(entities = created.len(), "scene loaded");
        for event in &file.events {
            send(&mut scene, &indexes, event)?;
        }
    }

    let snapshot = serde_json::to_string_pretty(&scene.snapshot()?)?;
    info!("final scene:\n{snapshot}");
    Ok(())
}

fn send(scene: &mut Scene, indexes: &Indexes, entry: &ScriptedEvent) -> eyre::Result<()> {
    let description = indexes
        .events
        .get(&entry.name)
        .ok_or_eyre(format!("event `{}` is not declared", entry.name))?;
    let payload = match &entry.payload {
        Some(json) => Value::from_json_typed(json, &description.payload)
            .wrap_err_with(|| format!("bad payload for `{}`", entry.name))?,
        None => Value::default_for(&description.payload),
    };

    let mut targets = Vec::with_capacity(entry.targets.len());
    for target in &entry.targets {
        let Some(entity) = scene.find_entity(target) else {
            bail!("no entity named `{target}`");
        };
        targets.push(entity);
    }

    let report = scene.send_event(&indexes.events, &entry.name, payload, targets)?;
    for failure in &report.failures {
        warn!(event = %entry.name, error = %failure, "dispatch failure");
    }
    info!(
        event = %entry.name,
        dispatched = report.dispatched.len(),
        invocations = report.invocations,
        failures = report.failures.len(),
        "event sent"
    );
    Ok(())
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
