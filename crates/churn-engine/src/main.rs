//! Engine entry point for the Churn simulation.
//!
//! Reads commit events from a JSON-lines file, feeds them through the
//! ingestion queue into the frame loop, and paces frames against a
//! wall-clock interval until the simulation terminates.
//!
//! # Architecture
//!
//! ```text
//! events.jsonl --> loader --> EventQueue --> SimulationLoop --> snapshots
//! ```
//!
//! Sorted input streams through a bounded queue while frames run;
//! unsorted input is loaded and reordered in full before the first
//! frame, mirroring the two ingestion modes of the queue.

mod error;
mod loader;
mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use churn_core::config::EngineConfig;
use churn_core::frame::SimulationLoop;
use churn_core::palette::{ColorAssigner, ColorRule};
use churn_core::physics::{build_engine, PhysicsEngine, PhysicsError, PhysicsSwitcher, PhysicsTuning};
use churn_core::queue::EventQueue;
use churn_core::registry::{EntityRegistry, EntityTuning};
use churn_types::SimulationPhase;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::snapshot::SnapshotPool;

/// Application entry point.
///
/// Initializes logging, loads configuration (path from the first
/// argument, `churn-config.yaml` by default, built-in defaults when
/// the file is absent), then runs the simulation to termination.
///
/// # Errors
///
/// Returns an error if initialization or the frame loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("churn-engine starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("churn-config.yaml"));
    let config = if Path::new(&config_path).exists() {
        let config = EngineConfig::from_file(Path::new(&config_path))?;
        info!(path = config_path, "configuration loaded");
        config
    } else {
        info!(path = config_path, "no config file, using defaults");
        EngineConfig::default()
    };

    run(config).await?;
    Ok(())
}

/// Assemble the pipeline from configuration and run it to termination.
async fn run(config: EngineConfig) -> Result<(), EngineError> {
    let palette = ColorAssigner::new(
        config
            .colors
            .rules
            .iter()
            .map(|rule| ColorRule {
                label: rule.label.clone(),
                pattern: rule.pattern.clone(),
                color: rule.color,
            })
            .collect(),
        &config.colors.default_label,
        config.colors.default_color,
    );
    for (label, color) in palette.legend() {
        tracing::debug!(label, ?color, "color rule");
    }

    let mut engines: Vec<(String, Box<dyn PhysicsEngine>)> = Vec::new();
    for entry in &config.physics.engines {
        let tuning = PhysicsTuning {
            edge_multiplier: entry.edge_multiplier,
            node_multiplier: entry.node_multiplier,
            speed_multiplier: entry.speed_multiplier,
            drag: entry.drag,
            canvas_width: config.canvas.width,
            canvas_height: config.canvas.height,
            seed: config.physics.seed,
        };
        engines.push((entry.name.clone(), build_engine(&entry.kind, tuning)?));
    }
    let mut switcher = PhysicsSwitcher::new(engines)?;
    switcher.select(&config.physics.selection)?;
    info!(
        strategies = ?switcher.names(),
        active = switcher.active_name(),
        "physics strategies configured"
    );

    // Entity tunables come from the startup selection; a runtime
    // strategy switch changes forces, not node creation parameters.
    let selected = config
        .physics
        .engines
        .iter()
        .find(|entry| entry.name == config.physics.selection)
        .ok_or_else(|| PhysicsError::UnknownSelection(config.physics.selection.clone()))?;
    let registry = EntityRegistry::new(EntityTuning {
        file_life_cap: config.life.file_cap,
        file_life_decrement: config.life.file_decrement,
        person_life_cap: config.life.person_cap,
        person_life_decrement: config.life.person_decrement,
        edge_life_cap: config.life.edge_cap,
        edge_life_decrement: config.life.edge_decrement,
        file_mass: selected.file_mass,
        person_mass: selected.person_mass,
        file_speed: selected.file_speed,
        person_speed: selected.person_speed,
        edge_length: selected.edge_length,
    });

    let queue = Arc::new(if config.input.sorted {
        EventQueue::sorted(config.input.queue_capacity)
    } else {
        EventQueue::unsorted()
    });

    let input_path = PathBuf::from(&config.input.path);
    let loader_task = if config.input.sorted {
        let queue = Arc::clone(&queue);
        Some(tokio::spawn(async move {
            loader::load_events(&input_path, &queue).await
        }))
    } else {
        // Unsorted input must be fully reordered before the first
        // frame can trust the queue head.
        let _ = loader::load_events(&input_path, &queue).await?;
        None
    };

    let snapshots = match &config.snapshot.path {
        Some(path) => Some(
            SnapshotPool::create(
                Path::new(path),
                config.snapshot.workers,
                config.snapshot.queue_capacity,
            )
            .await?,
        ),
        None => None,
    };

    let mut simulation = SimulationLoop::new(
        Arc::clone(&queue),
        registry,
        switcher,
        palette,
        config.frame.millis_per_frame(),
    );

    let mut interval = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.frame.frame_rate.max(1)),
    ));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut loop_error: Option<EngineError> = None;
    while simulation.phase() != SimulationPhase::Terminated {
        interval.tick().await;
        let summary = match simulation.run_frame().await {
            Ok(summary) => summary,
            Err(source) => {
                loop_error = Some(source.into());
                break;
            }
        };
        tracing::debug!(
            frame = summary.frame,
            phase = ?summary.phase,
            events = summary.events_applied,
            files = summary.alive_files,
            people = summary.alive_people,
            edges = summary.alive_edges,
            "frame complete"
        );
        if let Some(pool) = &snapshots {
            pool.submit(summary).await;
        }
    }

    if loop_error.is_some() {
        // Release a producer still parked on queue space so the join
        // below cannot hang.
        queue.fail(String::from("simulation aborted")).await;
    }

    // Drain background work and the loader even on the error path, so
    // queued snapshot writes reach disk before the process exits.
    if let Some(pool) = snapshots {
        pool.shutdown().await;
    }
    let loader_result = match loader_task {
        Some(task) => match task.await {
            Ok(result) => result.map(|_| ()),
            Err(source) => Err(EngineError::LoaderTask(source.to_string())),
        },
        None => Ok(()),
    };

    if let Some(source) = loop_error {
        return Err(source);
    }
    loader_result?;

    info!(
        frames = simulation.frame(),
        files_seen = simulation.registry().file_count(),
        people_seen = simulation.registry().person_count(),
        end = %simulation.simulated_time(),
        "simulation terminated"
    );
    for (name, touches) in simulation.registry().popular_files(10) {
        info!(file = name, touches, "popular file");
    }
    Ok(())
}
