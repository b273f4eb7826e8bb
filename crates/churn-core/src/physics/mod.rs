//! Physics strategies and runtime switching between them.
//!
//! A strategy implements [`PhysicsEngine`]: spawn placement for new
//! entities plus the per-frame relax and update passes over the
//! registry. Strategies are instantiated once at startup from a closed
//! name table ([`build_engine`]) and owned by a [`PhysicsSwitcher`],
//! which applies switch requests only at frame boundaries so a frame
//! never mixes two strategies.

mod simple;

pub use simple::SimplePhysics;

use churn_types::{NodeKind, SwitchDirection, Vec2};

use crate::registry::EntityRegistry;

/// Errors from strategy construction and selection.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// The switcher was built with an empty strategy list.
    #[error("no physics strategies configured")]
    NoEngines,
    /// A strategy kind name not present in the build table.
    #[error("unknown physics strategy kind '{0}'")]
    UnknownKind(String),
    /// A selection naming no configured strategy instance.
    #[error("physics selection '{0}' matches no configured strategy")]
    UnknownSelection(String),
}

/// Per-strategy tunables, read from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsTuning {
    /// Spring force multiplier for edge relaxation.
    pub edge_multiplier: f32,
    /// Repulsion multiplier for node relaxation.
    pub node_multiplier: f32,
    /// Scales the force-to-velocity conversion.
    pub speed_multiplier: f32,
    /// Per-frame velocity damping factor, in `[0, 1]`.
    pub drag: f32,
    /// Canvas width; spawn and clamp bound on the x axis.
    pub canvas_width: f32,
    /// Canvas height; spawn and clamp bound on the y axis.
    pub canvas_height: f32,
    /// Seed for the strategy's private random source.
    pub seed: u64,
}

/// One physics strategy: spawn placement plus the frame passes.
///
/// Every pass receives the registry mutably and operates only on the
/// alive views. The relax passes adjust velocities from forces; the
/// update passes apply motion and decay, evicting the dead through the
/// registry's retain helpers.
pub trait PhysicsEngine: Send {
    /// Stable name for selection, logging, and snapshots.
    fn name(&self) -> &'static str;

    /// Hook before the relax passes of a frame. No-op by default.
    fn initialize_frame(&mut self, registry: &mut EntityRegistry) {
        let _ = registry;
    }

    /// Hook after the update passes of a frame. No-op by default.
    fn finalize_frame(&mut self, registry: &mut EntityRegistry) {
        let _ = registry;
    }

    /// Apply spring forces along every alive edge.
    fn relax_edges(&mut self, registry: &mut EntityRegistry);

    /// Apply pairwise repulsion among alive files.
    fn relax_files(&mut self, registry: &mut EntityRegistry);

    /// Apply pairwise repulsion among alive people.
    fn relax_people(&mut self, registry: &mut EntityRegistry);

    /// Decay alive edges and evict the dead.
    fn update_edges(&mut self, registry: &mut EntityRegistry);

    /// Move, damp, and decay alive files; evict the dead.
    fn update_files(&mut self, registry: &mut EntityRegistry);

    /// Move, damp, and decay alive people; evict the dead.
    fn update_people(&mut self, registry: &mut EntityRegistry);

    /// Position for a newly created entity of the given kind.
    fn spawn_position(&mut self, kind: NodeKind) -> Vec2;

    /// Initial velocity for a newly created entity of the given kind.
    fn spawn_velocity(&mut self, kind: NodeKind, mass: f32) -> Vec2;
}

/// Instantiate a strategy by kind name.
///
/// The table is closed: adding a strategy means adding an arm here.
///
/// # Errors
///
/// Returns [`PhysicsError::UnknownKind`] for a name with no arm.
pub fn build_engine(
    kind: &str,
    tuning: PhysicsTuning,
) -> Result<Box<dyn PhysicsEngine>, PhysicsError> {
    match kind {
        "simple" => Ok(Box::new(SimplePhysics::new(tuning))),
        other => Err(PhysicsError::UnknownKind(other.to_owned())),
    }
}

/// Owns the configured strategy instances and the active selection.
///
/// Instances carry configuration-given names (several entries may
/// share a kind with different tunables). Switch requests are recorded
/// but deferred: [`Self::apply_pending`] is called by the frame loop
/// between frames, which is the only place the active strategy changes
/// after startup.
pub struct PhysicsSwitcher {
    engines: Vec<(String, Box<dyn PhysicsEngine>)>,
    active: usize,
    pending: Option<usize>,
}

impl PhysicsSwitcher {
    /// Build a switcher with the first instance active.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NoEngines`] for an empty list.
    pub fn new(engines: Vec<(String, Box<dyn PhysicsEngine>)>) -> Result<Self, PhysicsError> {
        if engines.is_empty() {
            return Err(PhysicsError::NoEngines);
        }
        Ok(Self {
            engines,
            active: 0,
            pending: None,
        })
    }

    /// Activate the instance with the given name immediately.
    ///
    /// Startup-time only; runtime changes go through
    /// [`Self::request_switch`].
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownSelection`] when no instance
    /// carries the name.
    pub fn select(&mut self, name: &str) -> Result<(), PhysicsError> {
        let index = self
            .engines
            .iter()
            .position(|(instance, _)| instance == name)
            .ok_or_else(|| PhysicsError::UnknownSelection(name.to_owned()))?;
        self.active = index;
        self.pending = None;
        Ok(())
    }

    /// Request a switch to the neighboring strategy, wrapping around.
    ///
    /// Takes effect at the next frame boundary. Requests compose: each
    /// one steps from the previously requested target, so `Next` then
    /// `Previous` within one frame lands back on the active strategy.
    pub fn request_switch(&mut self, direction: SwitchDirection) {
        let count = self.engines.len();
        let current = self.pending.unwrap_or(self.active);
        let target = match direction {
            SwitchDirection::Next => current.wrapping_add(1) % count,
            SwitchDirection::Previous => current.checked_sub(1).unwrap_or(count.saturating_sub(1)),
        };
        self.pending = Some(target);
    }

    /// Apply a deferred switch request, if any.
    ///
    /// Called by the frame loop between frames only. Returns the name
    /// of the newly active instance when a switch happened.
    // `active` and `pending` only ever hold indexes derived from the
    // non-empty engine list, so the lookups below cannot miss.
    #[allow(clippy::indexing_slicing)]
    pub fn apply_pending(&mut self) -> Option<&str> {
        let target = self.pending.take()?;
        if target == self.active {
            return None;
        }
        self.active = target;
        Some(self.engines[self.active].0.as_str())
    }

    /// The active strategy instance.
    #[allow(clippy::indexing_slicing)]
    pub fn active_mut(&mut self) -> &mut dyn PhysicsEngine {
        self.engines[self.active].1.as_mut()
    }

    /// Name of the active instance.
    #[allow(clippy::indexing_slicing)]
    pub fn active_name(&self) -> &str {
        &self.engines[self.active].0
    }

    /// Names of all configured instances, in configuration order.
    pub fn names(&self) -> Vec<&str> {
        self.engines.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl core::fmt::Debug for PhysicsSwitcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhysicsSwitcher")
            .field("engines", &self.names())
            .field("active", &self.active)
            .field("pending", &self.pending)
            .finish()
    }
}
