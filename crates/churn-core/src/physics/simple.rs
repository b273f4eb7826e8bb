//! The default force-directed strategy.
//!
//! Springs along edges, inverse-distance repulsion within each node
//! population, and straightforward Euler integration: velocity is
//! clamped to the node's maximum speed, applied to the position, and
//! damped by drag once per frame. Randomness (spawn placement and
//! initial velocity) comes from a private seeded generator, so runs
//! with the same seed and input place entities identically.

use churn_types::{NodeKind, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::physics::{PhysicsEngine, PhysicsTuning};
use crate::registry::EntityRegistry;

/// Spring-and-repulsion strategy, the `simple` entry in the build table.
#[derive(Debug)]
pub struct SimplePhysics {
    tuning: PhysicsTuning,
    rng: StdRng,
}

impl SimplePhysics {
    /// Create the strategy with its own seeded random source.
    pub fn new(tuning: PhysicsTuning) -> Self {
        Self {
            rng: StdRng::seed_from_u64(tuning.seed),
            tuning,
        }
    }

    /// Convert an accumulated force into a velocity change.
    ///
    /// Massless or force-free nodes are left untouched.
    fn accelerate(&self, velocity: Vec2, force: Vec2, mass: f32) -> Vec2 {
        if mass > 0.0 && force.length() > 0.0 {
            velocity.add(force.scale(self.tuning.speed_multiplier / mass))
        } else {
            velocity
        }
    }

    /// Sum of inverse-distance repulsion forces on each node in a
    /// population, computed against a position snapshot so the pass is
    /// order-independent.
    fn repulsion_forces(&self, positions: &[(String, Vec2)]) -> Vec<Vec2> {
        positions
            .iter()
            .map(|(_, here)| {
                let mut force = Vec2::ZERO;
                for (_, there) in positions {
                    let separation = here.sub(*there);
                    let distance = separation.length();
                    // Coincident nodes exert nothing on each other.
                    if distance > 0.0 {
                        let push = separation
                            .with_length(1.0)
                            .scale(self.tuning.node_multiplier / distance);
                        force = force.add(push);
                    }
                }
                force
            })
            .collect()
    }

    /// One integration step: clamp speed, move, stay on canvas, damp.
    fn integrate(&self, position: Vec2, velocity: Vec2, max_speed: f32) -> (Vec2, Vec2) {
        let mut velocity = velocity;
        if velocity.length() > max_speed {
            velocity = velocity.with_length(max_speed);
        }
        let bounds = Vec2::new(self.tuning.canvas_width, self.tuning.canvas_height);
        let position = position.add(velocity).clamp_axes(Vec2::ZERO, bounds);
        (position, velocity.scale(self.tuning.drag))
    }
}

impl PhysicsEngine for SimplePhysics {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn relax_edges(&mut self, registry: &mut EntityRegistry) {
        // Snapshot endpoint positions, then apply the symmetric spring
        // impulse to both ends.
        let springs: Vec<_> = registry
            .alive_edges()
            .iter()
            .filter_map(|key| {
                let edge = registry.edge(key)?;
                let file = registry.file(&key.file)?;
                let person = registry.person(&key.person)?;
                Some((
                    key.clone(),
                    edge.rest_length,
                    file.position,
                    person.position,
                ))
            })
            .collect();

        for (key, rest_length, file_position, person_position) in springs {
            let separation = person_position.sub(file_position);
            let distance = separation.length();
            if distance <= 0.0 {
                continue;
            }
            // Stretched springs attract, compressed ones repel.
            let pull = separation
                .with_length(1.0)
                .scale((distance - rest_length) * self.tuning.edge_multiplier);

            if let Some(file) = registry.file_mut(&key.file) {
                file.velocity = self.accelerate(file.velocity, pull, file.mass);
            }
            if let Some(person) = registry.person_mut(&key.person) {
                person.velocity = self.accelerate(person.velocity, pull.negate(), person.mass);
            }
        }
    }

    fn relax_files(&mut self, registry: &mut EntityRegistry) {
        let positions: Vec<(String, Vec2)> = registry
            .alive_files()
            .iter()
            .filter_map(|name| registry.file(name).map(|node| (name.clone(), node.position)))
            .collect();
        let forces = self.repulsion_forces(&positions);

        for ((name, _), force) in positions.into_iter().zip(forces) {
            if let Some(node) = registry.file_mut(&name) {
                node.velocity = self.accelerate(node.velocity, force, node.mass);
            }
        }
    }

    fn relax_people(&mut self, registry: &mut EntityRegistry) {
        let positions: Vec<(String, Vec2)> = registry
            .alive_people()
            .iter()
            .filter_map(|name| {
                registry.person(name).map(|node| (name.clone(), node.position))
            })
            .collect();
        let forces = self.repulsion_forces(&positions);

        for ((name, _), force) in positions.into_iter().zip(forces) {
            if let Some(node) = registry.person_mut(&name) {
                node.velocity = self.accelerate(node.velocity, force, node.mass);
            }
        }
    }

    fn update_edges(&mut self, registry: &mut EntityRegistry) {
        registry.retain_alive_edges(|edge| edge.lifespan.decay());
    }

    fn update_files(&mut self, registry: &mut EntityRegistry) {
        let this = &*self;
        registry.retain_alive_files(|node| {
            let (position, velocity) =
                this.integrate(node.position, node.velocity, node.max_speed);
            node.position = position;
            node.velocity = velocity;
            node.lifespan.decay()
        });
    }

    fn update_people(&mut self, registry: &mut EntityRegistry) {
        let this = &*self;
        registry.retain_alive_people(|node| {
            let (position, velocity) =
                this.integrate(node.position, node.velocity, node.max_speed);
            node.position = position;
            node.velocity = velocity;
            node.lifespan.decay()
        });
    }

    fn spawn_position(&mut self, _kind: NodeKind) -> Vec2 {
        Vec2::new(
            self.rng.random_range(0.0..self.tuning.canvas_width),
            self.rng.random_range(0.0..self.tuning.canvas_height),
        )
    }

    fn spawn_velocity(&mut self, _kind: NodeKind, mass: f32) -> Vec2 {
        // Massless nodes cannot be accelerated, so they spawn at rest.
        if mass <= 0.0 {
            return Vec2::ZERO;
        }
        // Heavier nodes start with proportionally larger random kicks.
        Vec2::new(
            self.rng.random_range(-mass..=mass),
            self.rng.random_range(-mass..=mass),
        )
    }
}
