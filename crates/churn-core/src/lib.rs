//! Simulation engine for Churn: repository history as particle physics.
//!
//! This crate owns everything between a stream of commit events and a
//! renderable world: the ingestion queue, the entity registry with its
//! life/decay model, color assignment, activity histograms, the
//! pluggable physics strategies, and the frame loop that ties them
//! together.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `churn-config.yaml` into
//!   strongly-typed structs.
//! - [`entity`] -- File, person, and edge entities plus the shared
//!   [`Lifespan`] decay model.
//! - [`frame`] -- The [`SimulationLoop`] frame state machine.
//! - [`histogram`] -- Per-frame color bins and the bounded activity
//!   windows.
//! - [`palette`] -- Ordered first-match color rules for file hues.
//! - [`physics`] -- The [`PhysicsEngine`] trait, the `simple`
//!   strategy, and frame-boundary switching.
//! - [`queue`] -- The sorted/unsorted ingestion queue between loader
//!   and loop.
//! - [`registry`] -- The [`EntityRegistry`] and its touch/decay
//!   lifecycle operations.
//!
//! [`Lifespan`]: entity::Lifespan
//! [`SimulationLoop`]: frame::SimulationLoop
//! [`PhysicsEngine`]: physics::PhysicsEngine
//! [`EntityRegistry`]: registry::EntityRegistry

pub mod config;
pub mod entity;
pub mod frame;
pub mod histogram;
pub mod palette;
pub mod physics;
pub mod queue;
pub mod registry;
