//! Enumeration types shared across the simulation.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the simulation loop.
///
/// Transitions only move forward: `Loading -> Running -> CoolingDown
/// -> Terminated`. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    /// Waiting for the ingestion queue to yield its first event.
    Loading,
    /// Draining events and advancing simulated time each frame.
    Running,
    /// The event source is exhausted; time is frozen while remaining
    /// entities decay.
    CoolingDown,
    /// No visible life remains; the loop has released its resources.
    Terminated,
}

/// The two node populations a physics spawn policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A file particle.
    File,
    /// A person (contributor) particle.
    Person,
}

/// Direction of a physics strategy switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    /// Move to the next configured strategy, wrapping at the end.
    Next,
    /// Move to the previous configured strategy, wrapping at the start.
    Previous,
}
