//! Shared type definitions for the Churn simulation.
//!
//! This crate is the single source of truth for the small value types
//! used across the Churn workspace: the canonical commit event decoded
//! from a repository log, the 2D vector used by the physics passes, the
//! RGB color value used for file hues and the activity histogram, and
//! the simulation phase enum.
//!
//! # Modules
//!
//! - [`event`] -- The canonical [`CommitEvent`] record
//! - [`vec2`] -- Minimal 2D vector math for positions and velocities
//! - [`color`] -- [`Rgb`] color values with deterministic ordering
//! - [`enums`] -- Simulation phase, node kind, and switch direction

pub mod color;
pub mod enums;
pub mod event;
pub mod vec2;

// Re-export all public types at crate root for convenience.
pub use color::Rgb;
pub use enums::{NodeKind, SimulationPhase, SwitchDirection};
pub use event::CommitEvent;
pub use vec2::Vec2;
