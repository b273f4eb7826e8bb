//! The frame loop: event application, histograms, physics, phases.
//!
//! One [`SimulationLoop::run_frame`] call advances the simulated clock
//! by the configured per-frame span, drains every event due before the
//! frame end, tallies activity, and runs the physics pipeline in its
//! fixed order. Phase transitions happen only here, and the active
//! physics strategy changes only between frames, so a frame is never
//! half-old, half-new.
//!
//! Simulated time is decoupled from wall time: the caller paces calls
//! however it likes (an interval timer in the engine binary, or not at
//! all in tests) without changing what any frame computes.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use churn_types::{SimulationPhase, SwitchDirection};
use serde::Serialize;

use crate::histogram::{ActivityHistogram, ColorBins};
use crate::palette::ColorAssigner;
use crate::physics::PhysicsSwitcher;
use crate::queue::{EventQueue, QueueError};
use crate::registry::{EntityRegistry, RegistryError};

/// Errors that abort the frame loop.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The ingestion queue failed (producer protocol violation).
    #[error("event queue failure: {source}")]
    Queue {
        /// The underlying queue error.
        #[from]
        source: QueueError,
    },

    /// An event touched entities in an impossible order.
    #[error("registry failure: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: RegistryError,
    },
}

/// What one frame did, for logging and background snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    /// Frame number, counted from 1.
    pub frame: u64,
    /// Phase after the frame completed.
    pub phase: SimulationPhase,
    /// Events applied during this frame.
    pub events_applied: usize,
    /// Alive file count after the physics passes.
    pub alive_files: usize,
    /// Alive person count after the physics passes.
    pub alive_people: usize,
    /// Alive edge count after the physics passes.
    pub alive_edges: usize,
    /// Simulated time at the end of the frame, epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub simulated_time: DateTime<Utc>,
    /// The physics strategy instance that ran this frame.
    pub strategy: String,
}

/// The simulation loop state machine.
pub struct SimulationLoop {
    queue: Arc<EventQueue>,
    registry: EntityRegistry,
    switcher: PhysicsSwitcher,
    palette: ColorAssigner,
    histogram: ActivityHistogram,
    phase: SimulationPhase,
    /// Simulated time at the start of the next frame.
    clock: DateTime<Utc>,
    millis_per_frame: i64,
    frame: u64,
}

impl SimulationLoop {
    /// Assemble a loop in the `Loading` phase.
    pub fn new(
        queue: Arc<EventQueue>,
        registry: EntityRegistry,
        switcher: PhysicsSwitcher,
        palette: ColorAssigner,
        millis_per_frame: i64,
    ) -> Self {
        Self {
            queue,
            registry,
            switcher,
            palette,
            histogram: ActivityHistogram::default(),
            phase: SimulationPhase::Loading,
            clock: DateTime::UNIX_EPOCH,
            millis_per_frame,
            frame: 0,
        }
    }

    /// Run one frame to completion.
    ///
    /// A terminated loop is inert: further calls return a summary of
    /// the final state without doing anything.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the queue fails or an event touches
    /// entities out of order; both are unrecoverable.
    pub async fn run_frame(&mut self) -> Result<FrameSummary, FrameError> {
        if self.phase == SimulationPhase::Terminated {
            return Ok(self.summary(0));
        }

        // Align the clock with the input before the first frame. An
        // input that closes without a single event skips straight to
        // cooldown and terminates below.
        if self.phase == SimulationPhase::Loading {
            match self.queue.first_timestamp().await? {
                Some(first) => {
                    self.clock = first;
                    self.phase = SimulationPhase::Running;
                    tracing::info!(start = %first, "input aligned, simulation running");
                }
                None => {
                    self.phase = SimulationPhase::CoolingDown;
                    tracing::info!("input closed without events");
                }
            }
        }

        self.frame = self.frame.saturating_add(1);

        // The person-count window samples the population as the frame
        // opens, before this frame's touches and decay move it.
        self.histogram.push_people(self.registry.alive_people().len());
        let mut bins = ColorBins::new();

        let frame_end = self
            .clock
            .checked_add_signed(TimeDelta::milliseconds(self.millis_per_frame))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut events_applied = 0_usize;
        while let Some(event) = self.queue.take_due(frame_end).await? {
            let hue = self.registry.touch_file(
                &event.filename,
                event.weight,
                self.switcher.active_mut(),
                &self.palette,
            );
            bins.add(hue);
            self.registry
                .touch_person(&event.author, hue, self.switcher.active_mut());
            self.registry.touch_edge(&event.filename, &event.author)?;
            events_applied = events_applied.saturating_add(1);
        }

        // Time freezes during cooldown; the remaining frames only decay.
        if self.phase == SimulationPhase::Running {
            self.clock = frame_end;
        }

        bins.finalize();
        self.histogram.push_bins(bins);

        let physics = self.switcher.active_mut();
        physics.initialize_frame(&mut self.registry);
        physics.relax_edges(&mut self.registry);
        physics.relax_files(&mut self.registry);
        physics.relax_people(&mut self.registry);
        physics.update_edges(&mut self.registry);
        physics.update_files(&mut self.registry);
        physics.update_people(&mut self.registry);
        physics.finalize_frame(&mut self.registry);

        if self.phase == SimulationPhase::Running && self.queue.is_exhausted().await {
            self.phase = SimulationPhase::CoolingDown;
            tracing::info!(frame = self.frame, "input exhausted, cooling down");
        }
        if self.phase == SimulationPhase::CoolingDown && self.registry.alive_files().is_empty() {
            self.phase = SimulationPhase::Terminated;
            tracing::info!(frame = self.frame, "all files faded, terminated");
        }

        let summary = self.summary(events_applied);

        // The frame boundary: the only point a strategy switch lands.
        if let Some(name) = self.switcher.apply_pending() {
            tracing::info!(strategy = name, "physics strategy switched");
        }

        Ok(summary)
    }

    fn summary(&self, events_applied: usize) -> FrameSummary {
        FrameSummary {
            frame: self.frame,
            phase: self.phase,
            events_applied,
            alive_files: self.registry.alive_files().len(),
            alive_people: self.registry.alive_people().len(),
            alive_edges: self.registry.alive_edges().len(),
            simulated_time: self.clock,
            strategy: self.switcher.active_name().to_owned(),
        }
    }

    /// Record a strategy switch request for the next frame boundary.
    pub fn request_physics_switch(&mut self, direction: SwitchDirection) {
        self.switcher.request_switch(direction);
    }

    /// Current phase.
    pub const fn phase(&self) -> SimulationPhase {
        self.phase
    }

    /// Frames completed so far.
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated time at the start of the next frame.
    pub const fn simulated_time(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Read access to the entity registry for rendering.
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Read access to the activity windows for rendering.
    pub const fn histogram(&self) -> &ActivityHistogram {
        &self.histogram
    }

    /// Name of the strategy instance currently running.
    pub fn active_strategy(&self) -> &str {
        self.switcher.active_name()
    }

    /// All configured strategy instance names, in switch order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.switcher.names()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use churn_types::{CommitEvent, Rgb};

    use super::*;
    use crate::physics::tests::FixedSpawn;
    use crate::physics::PhysicsEngine;
    use crate::registry::EntityTuning;

    fn tuning(file_cap: i32) -> EntityTuning {
        EntityTuning {
            file_life_cap: file_cap,
            file_life_decrement: -1,
            person_life_cap: 255,
            person_life_decrement: -1,
            edge_life_cap: 255,
            edge_life_decrement: -2,
            file_mass: 1.0,
            person_mass: 10.0,
            file_speed: 7.0,
            person_speed: 2.0,
            edge_length: 25.0,
        }
    }

    fn event(millis: i64, author: &str, filename: &str) -> CommitEvent {
        CommitEvent {
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            author: author.to_owned(),
            filename: filename.to_owned(),
            weight: 1,
        }
    }

    fn simulation(queue: Arc<EventQueue>, file_cap: i32, millis_per_frame: i64) -> SimulationLoop {
        let engines: Vec<(String, Box<dyn PhysicsEngine>)> = vec![
            (String::from("calm"), Box::new(FixedSpawn)),
            (String::from("still"), Box::new(FixedSpawn)),
        ];
        SimulationLoop::new(
            queue,
            EntityRegistry::new(tuning(file_cap)),
            PhysicsSwitcher::new(engines).unwrap(),
            ColorAssigner::new(Vec::new(), "Everything", Rgb::GRAY),
            millis_per_frame,
        )
    }

    #[tokio::test]
    async fn events_land_in_their_frames() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.push(event(0, "bob", "a.txt")).await.unwrap();
        queue.push(event(100, "alice", "a.txt")).await.unwrap();
        queue.close().await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);

        // Frame 1 covers [0, 50): both timestamp-0 events land on one
        // file.
        let first = simulation.run_frame().await.unwrap();
        assert_eq!(first.events_applied, 2);
        assert_eq!(first.alive_files, 1);
        assert_eq!(first.alive_people, 2);
        assert_eq!(first.alive_edges, 2);
        assert_eq!(simulation.registry().file("a.txt").unwrap().touches, 2);

        // Frame 2 covers [50, 100): the event at 100 is not yet due.
        let second = simulation.run_frame().await.unwrap();
        assert_eq!(second.events_applied, 0);

        // Frame 3 covers [100, 150): alice's edge is refreshed to full
        // life while bob's keeps decaying.
        let third = simulation.run_frame().await.unwrap();
        assert_eq!(third.events_applied, 1);
        let alice = simulation
            .registry()
            .edge(&crate::entity::EdgeKey::new("a.txt", "alice"))
            .unwrap();
        let bob = simulation
            .registry()
            .edge(&crate::entity::EdgeKey::new("a.txt", "bob"))
            .unwrap();
        assert!(alice.lifespan.life() > bob.lifespan.life());
        assert_eq!(simulation.phase(), SimulationPhase::CoolingDown);
    }

    #[tokio::test]
    async fn terminates_one_frame_after_the_last_file_fades() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.close().await;

        // Life 2 with decrement -1: alive after the first decay, dead
        // after the second.
        let mut simulation = simulation(Arc::clone(&queue), 2, 50);

        let first = simulation.run_frame().await.unwrap();
        assert_eq!(first.phase, SimulationPhase::CoolingDown);
        assert_eq!(first.alive_files, 1);

        let second = simulation.run_frame().await.unwrap();
        assert_eq!(second.phase, SimulationPhase::Terminated);
        assert_eq!(second.alive_files, 0);

        // Terminated loops are inert.
        let third = simulation.run_frame().await.unwrap();
        assert_eq!(third.frame, second.frame);
    }

    #[tokio::test]
    async fn cooldown_freezes_the_clock() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.close().await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);
        let first = simulation.run_frame().await.unwrap();
        assert_eq!(first.phase, SimulationPhase::CoolingDown);
        let frozen = simulation.simulated_time();

        let _ = simulation.run_frame().await.unwrap();
        assert_eq!(simulation.simulated_time(), frozen);
    }

    #[tokio::test]
    async fn empty_input_terminates_in_one_frame() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.close().await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);
        let summary = simulation.run_frame().await.unwrap();
        assert_eq!(summary.phase, SimulationPhase::Terminated);
        assert_eq!(summary.events_applied, 0);
    }

    #[tokio::test]
    async fn strategy_switch_lands_at_the_frame_boundary() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.close().await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);
        simulation.request_physics_switch(SwitchDirection::Next);
        // The request must not take effect inside the running frame.
        assert_eq!(simulation.active_strategy(), "calm");

        let summary = simulation.run_frame().await.unwrap();
        // The frame itself ran under the old strategy; the switch
        // landed only at its boundary.
        assert_eq!(summary.strategy, "calm");
        assert_eq!(simulation.active_strategy(), "still");
    }

    #[tokio::test]
    async fn histogram_windows_fill_per_frame() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.push(event(60, "alice", "a.txt")).await.unwrap();
        queue.close().await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);
        let _ = simulation.run_frame().await.unwrap();
        let _ = simulation.run_frame().await.unwrap();

        assert_eq!(simulation.histogram().bins().len(), 2);
        assert_eq!(simulation.histogram().people().len(), 2);
        // Nobody was alive when frame 1 opened; alice was by frame 2.
        assert_eq!(
            simulation.histogram().people().iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
        let latest = simulation.histogram().bins().back().unwrap();
        assert_eq!(latest.count(Rgb::GRAY), 1);
    }

    #[tokio::test]
    async fn producer_failure_aborts_the_loop() {
        let queue = Arc::new(EventQueue::sorted(16));
        queue.push(event(0, "alice", "a.txt")).await.unwrap();
        queue.fail(String::from("input stream violated ordering")).await;

        let mut simulation = simulation(Arc::clone(&queue), 255, 50);
        assert!(matches!(
            simulation.run_frame().await,
            Err(FrameError::Queue { .. })
        ));
    }
}
