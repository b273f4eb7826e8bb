//! The authoritative entity registry and lifecycle operations.
//!
//! The registry owns three maps -- files by path, people by author
//! name, edges by endpoint pair -- plus the "currently alive" id lists
//! consumed by the physics passes and by rendering. The maps never
//! shrink: an entity whose life reaches 0 is evicted from the alive
//! view but stays in its map, so a later touch revives it with its
//! accumulated touch history intact.
//!
//! Alive-list membership is maintained *exactly* by the operations in
//! this module (touch revives, retain evicts); nothing else may infer
//! it lazily. All maps are `BTreeMap` so iteration order -- and with
//! it every physics pass -- is deterministic.

use std::collections::BTreeMap;

use churn_types::{NodeKind, Rgb};

use crate::entity::{Edge, EdgeKey, FileNode, Lifespan, PersonNode};
use crate::palette::ColorAssigner;
use crate::physics::PhysicsEngine;

/// Errors raised by registry operations.
///
/// These signal a broken ordering invariant elsewhere in the engine,
/// not a recoverable condition: callers abort with full context.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An edge touch referenced an endpoint the registry has never
    /// seen. Events always touch the file and person before the edge,
    /// so this cannot happen unless event application is out of order.
    #[error("edge touch for unknown endpoint: file '{file}', person '{person}'")]
    MissingEdgeEndpoint {
        /// The file identifier of the offending pair.
        file: String,
        /// The person identifier of the offending pair.
        person: String,
    },
}

/// Per-entity-kind tunables the registry needs at creation time.
///
/// Passed in explicitly at construction; there is no process-wide
/// configuration state.
#[derive(Debug, Clone, Copy)]
pub struct EntityTuning {
    /// File life cap (reset value on touch).
    pub file_life_cap: i32,
    /// File per-frame life change, strictly negative.
    pub file_life_decrement: i32,
    /// Person life cap.
    pub person_life_cap: i32,
    /// Person per-frame life change, strictly negative.
    pub person_life_decrement: i32,
    /// Edge life cap.
    pub edge_life_cap: i32,
    /// Edge per-frame life change, strictly negative.
    pub edge_life_decrement: i32,
    /// File particle mass.
    pub file_mass: f32,
    /// Person particle mass.
    pub person_mass: f32,
    /// File maximum speed.
    pub file_speed: f32,
    /// Person maximum speed.
    pub person_speed: f32,
    /// Preferred spring length for new edges.
    pub edge_length: f32,
}

/// The registry of all entities the simulation has ever seen.
#[derive(Debug)]
pub struct EntityRegistry {
    tuning: EntityTuning,
    files: BTreeMap<String, FileNode>,
    people: BTreeMap<String, PersonNode>,
    edges: BTreeMap<EdgeKey, Edge>,
    alive_files: Vec<String>,
    alive_people: Vec<String>,
    alive_edges: Vec<EdgeKey>,
    /// Highest touch count any file has reached, for the popularity
    /// threshold. Monotonically non-decreasing.
    max_touches: i64,
}

impl EntityRegistry {
    /// Create an empty registry with the given tunables.
    pub const fn new(tuning: EntityTuning) -> Self {
        Self {
            tuning,
            files: BTreeMap::new(),
            people: BTreeMap::new(),
            edges: BTreeMap::new(),
            alive_files: Vec::new(),
            alive_people: Vec::new(),
            alive_edges: Vec::new(),
            max_touches: 0,
        }
    }

    // -----------------------------------------------------------------
    // Touch operations (one per ingested event)
    // -----------------------------------------------------------------

    /// Touch a file: create it or revive/refresh it.
    ///
    /// A new file spawns at the active physics strategy's spawn
    /// position/velocity with a hue from the color rules and
    /// `touches = weight`. An existing file is freshened: life back to
    /// cap, weight added to touches (floored at 0), and moved back
    /// into the alive list if it was dormant. Returns the file's hue
    /// for the frame's histogram tally.
    pub fn touch_file(
        &mut self,
        name: &str,
        weight: u32,
        physics: &mut dyn PhysicsEngine,
        palette: &ColorAssigner,
    ) -> Rgb {
        if let Some(node) = self.files.get_mut(name) {
            if !node.lifespan.is_alive() {
                self.alive_files.push(name.to_owned());
            }
            let touches = node.freshen(weight);
            if touches > self.max_touches {
                self.max_touches = touches;
            }
            node.hue
        } else {
            let hue = palette.assign(name);
            let mass = self.tuning.file_mass;
            let node = FileNode {
                name: name.to_owned(),
                position: physics.spawn_position(NodeKind::File),
                velocity: physics.spawn_velocity(NodeKind::File, mass),
                mass,
                max_speed: self.tuning.file_speed,
                lifespan: Lifespan::new(
                    self.tuning.file_life_cap,
                    self.tuning.file_life_decrement,
                ),
                touches: i64::from(weight),
                hue,
            };
            if node.touches > self.max_touches {
                self.max_touches = node.touches;
            }
            self.files.insert(name.to_owned(), node);
            self.alive_files.push(name.to_owned());
            hue
        }
    }

    /// Touch a person: create or revive/refresh, then blend the
    /// touched file's hue into their color identity.
    ///
    /// Person touches count 1 per event regardless of weight.
    pub fn touch_person(&mut self, name: &str, hue: Rgb, physics: &mut dyn PhysicsEngine) {
        if let Some(node) = self.people.get_mut(name) {
            if !node.lifespan.is_alive() {
                self.alive_people.push(name.to_owned());
            }
            node.freshen();
            node.add_color(hue);
        } else {
            let mass = self.tuning.person_mass;
            let mut node = PersonNode::new(
                name.to_owned(),
                physics.spawn_position(NodeKind::Person),
                physics.spawn_velocity(NodeKind::Person, mass),
                mass,
                self.tuning.person_speed,
                Lifespan::new(
                    self.tuning.person_life_cap,
                    self.tuning.person_life_decrement,
                ),
            );
            node.add_color(hue);
            self.people.insert(name.to_owned(), node);
            self.alive_people.push(name.to_owned());
        }
    }

    /// Touch the edge for a (file, person) pair.
    ///
    /// At most one edge ever exists per pair. Created with the
    /// configured rest length on the first touch; afterwards life is
    /// reset to cap and alive membership restored if dormant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingEdgeEndpoint`] if either
    /// endpoint has never been registered -- an ordering invariant
    /// violation the caller must treat as fatal.
    pub fn touch_edge(&mut self, file: &str, person: &str) -> Result<(), RegistryError> {
        if !self.files.contains_key(file) || !self.people.contains_key(person) {
            return Err(RegistryError::MissingEdgeEndpoint {
                file: file.to_owned(),
                person: person.to_owned(),
            });
        }

        let key = EdgeKey::new(file, person);
        if let Some(edge) = self.edges.get_mut(&key) {
            if !edge.lifespan.is_alive() {
                self.alive_edges.push(key);
            }
            edge.lifespan.freshen();
        } else {
            let edge = Edge {
                key: key.clone(),
                lifespan: Lifespan::new(
                    self.tuning.edge_life_cap,
                    self.tuning.edge_life_decrement,
                ),
                rest_length: self.tuning.edge_length,
            };
            self.edges.insert(key.clone(), edge);
            self.alive_edges.push(key);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Survivor filtering (called by the physics update passes)
    // -----------------------------------------------------------------

    /// Run `step` over every alive file and keep only survivors.
    ///
    /// `step` typically applies motion and then decay; returning
    /// `false` evicts the file from the alive list (the map entry
    /// stays) and expires its remaining life, so dormancy is always
    /// observable through the lifespan and a later touch revives it.
    /// This is the single place alive-file membership shrinks, so
    /// physics survivor filtering and registry membership always
    /// agree.
    pub fn retain_alive_files(&mut self, mut step: impl FnMut(&mut FileNode) -> bool) {
        let names = core::mem::take(&mut self.alive_files);
        for name in names {
            if let Some(node) = self.files.get_mut(&name) {
                if step(node) {
                    self.alive_files.push(name);
                } else {
                    node.lifespan.expire();
                }
            }
        }
    }

    /// Run `step` over every alive person and keep only survivors.
    pub fn retain_alive_people(&mut self, mut step: impl FnMut(&mut PersonNode) -> bool) {
        let names = core::mem::take(&mut self.alive_people);
        for name in names {
            if let Some(node) = self.people.get_mut(&name) {
                if step(node) {
                    self.alive_people.push(name);
                } else {
                    node.lifespan.expire();
                }
            }
        }
    }

    /// Run `step` over every alive edge and keep only survivors.
    ///
    /// The frame pipeline decays edges before files and people, so an
    /// edge never observes an endpoint that was evicted earlier in the
    /// same frame.
    pub fn retain_alive_edges(&mut self, mut step: impl FnMut(&mut Edge) -> bool) {
        let keys = core::mem::take(&mut self.alive_edges);
        for key in keys {
            if let Some(edge) = self.edges.get_mut(&key) {
                if step(edge) {
                    self.alive_edges.push(key);
                } else {
                    edge.lifespan.expire();
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Ids of files currently alive, in revival order.
    pub fn alive_files(&self) -> &[String] {
        &self.alive_files
    }

    /// Ids of people currently alive, in revival order.
    pub fn alive_people(&self) -> &[String] {
        &self.alive_people
    }

    /// Keys of edges currently alive, in revival order.
    pub fn alive_edges(&self) -> &[EdgeKey] {
        &self.alive_edges
    }

    /// Look up a file by id.
    pub fn file(&self, name: &str) -> Option<&FileNode> {
        self.files.get(name)
    }

    /// Look up a file by id, mutably.
    pub fn file_mut(&mut self, name: &str) -> Option<&mut FileNode> {
        self.files.get_mut(name)
    }

    /// Look up a person by id.
    pub fn person(&self, name: &str) -> Option<&PersonNode> {
        self.people.get(name)
    }

    /// Look up a person by id, mutably.
    pub fn person_mut(&mut self, name: &str) -> Option<&mut PersonNode> {
        self.people.get_mut(name)
    }

    /// Look up an edge by key.
    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Total files ever seen (alive or dormant).
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total people ever seen (alive or dormant).
    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    /// Total edges ever created (alive or dormant).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The highest touch count any file has reached.
    pub const fn max_touches(&self) -> i64 {
        self.max_touches
    }

    /// Whether a file qualifies as popular: touches at or above half
    /// the global maximum.
    pub const fn qualifies(&self, node: &FileNode) -> bool {
        node.touches.saturating_mul(2) >= self.max_touches
    }

    /// The qualifying files with the highest touch counts, descending,
    /// capped at `limit`. Includes dormant files: popularity survives
    /// dormancy by design of the touch counter.
    pub fn popular_files(&self, limit: usize) -> Vec<(String, i64)> {
        let mut ranked: Vec<(String, i64)> = self
            .files
            .values()
            .filter(|node| self.qualifies(node))
            .map(|node| (node.name.clone(), node.touches))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::physics::tests::FixedSpawn;

    fn tuning() -> EntityTuning {
        EntityTuning {
            file_life_cap: 255,
            file_life_decrement: -2,
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

    fn palette() -> ColorAssigner {
        ColorAssigner::new(Vec::new(), "Everything", Rgb::GRAY)
    }

    #[test]
    fn double_touch_in_frame_sums_weights_into_one_node() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("a.txt", 3, &mut spawn, &palette);
        let _ = registry.touch_file("a.txt", 4, &mut spawn, &palette);

        assert_eq!(registry.file_count(), 1);
        let node = registry.file("a.txt").unwrap();
        assert_eq!(node.touches, 7);
        assert_eq!(node.lifespan.life(), node.lifespan.cap());
        assert_eq!(registry.alive_files().len(), 1);
        assert_eq!(registry.max_touches(), 7);
    }

    #[test]
    fn dormant_file_revives_with_history() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("a.txt", 5, &mut spawn, &palette);
        // Kill it via survivor filtering.
        registry.retain_alive_files(|_| false);
        assert!(registry.alive_files().is_empty());
        assert_eq!(registry.file_count(), 1);

        let _ = registry.touch_file("a.txt", 1, &mut spawn, &palette);
        assert_eq!(registry.alive_files().len(), 1);
        assert_eq!(registry.file("a.txt").unwrap().touches, 6);
    }

    #[test]
    fn person_touch_increments_by_one_not_weight() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();

        registry.touch_person("alice", Rgb::GRAY, &mut spawn);
        registry.touch_person("alice", Rgb::GRAY, &mut spawn);
        // touches starts at 1 on creation, +1 for the second touch.
        assert_eq!(registry.person("alice").unwrap().touches, 2);
    }

    #[test]
    fn edge_is_unique_per_pair() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("a.txt", 1, &mut spawn, &palette);
        registry.touch_person("alice", Rgb::GRAY, &mut spawn);
        for _ in 0..5 {
            registry.touch_edge("a.txt", "alice").unwrap();
        }

        assert_eq!(registry.edge_count(), 1);
        let key = EdgeKey::new("a.txt", "alice");
        let edge = registry.edge(&key).unwrap();
        assert_eq!(edge.lifespan.life(), edge.lifespan.cap());
        assert_eq!(registry.alive_edges().len(), 1);
    }

    #[test]
    fn edge_touch_for_unknown_endpoint_fails() {
        let mut registry = EntityRegistry::new(tuning());
        let result = registry.touch_edge("ghost.txt", "nobody");
        assert!(matches!(
            result,
            Err(RegistryError::MissingEdgeEndpoint { .. })
        ));
    }

    #[test]
    fn eviction_expires_life_so_touch_revives() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("a.txt", 1, &mut spawn, &palette);
        registry.touch_person("alice", Rgb::GRAY, &mut spawn);
        registry.touch_edge("a.txt", "alice").unwrap();

        // Evict everything while life is still at cap; dormancy must
        // be observable through the lifespan regardless.
        registry.retain_alive_edges(|_| false);
        registry.retain_alive_files(|_| false);
        registry.retain_alive_people(|_| false);
        assert!(!registry.file("a.txt").unwrap().lifespan.is_alive());
        assert!(!registry.person("alice").unwrap().lifespan.is_alive());
        let key = EdgeKey::new("a.txt", "alice");
        assert!(!registry.edge(&key).unwrap().lifespan.is_alive());

        // A touch after such an eviction restores alive membership.
        let _ = registry.touch_file("a.txt", 1, &mut spawn, &palette);
        registry.touch_person("alice", Rgb::GRAY, &mut spawn);
        registry.touch_edge("a.txt", "alice").unwrap();
        assert_eq!(registry.alive_files().len(), 1);
        assert_eq!(registry.alive_people().len(), 1);
        assert_eq!(registry.alive_edges().len(), 1);
    }

    #[test]
    fn retain_evicts_exactly_the_dead() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("keep.txt", 1, &mut spawn, &palette);
        let _ = registry.touch_file("drop.txt", 1, &mut spawn, &palette);

        registry.retain_alive_files(|node| node.name == "keep.txt");
        assert_eq!(registry.alive_files(), &[String::from("keep.txt")]);
        // The dropped file is dormant, not deleted.
        assert_eq!(registry.file_count(), 2);
    }

    #[test]
    fn popularity_threshold_is_half_of_max() {
        let mut registry = EntityRegistry::new(tuning());
        let mut spawn = FixedSpawn::default();
        let palette = palette();

        let _ = registry.touch_file("hot.txt", 10, &mut spawn, &palette);
        let _ = registry.touch_file("warm.txt", 5, &mut spawn, &palette);
        let _ = registry.touch_file("cold.txt", 4, &mut spawn, &palette);

        let hot = registry.file("hot.txt").unwrap();
        let warm = registry.file("warm.txt").unwrap();
        let cold = registry.file("cold.txt").unwrap();
        assert!(registry.qualifies(hot));
        assert!(registry.qualifies(warm));
        assert!(!registry.qualifies(cold));

        let popular = registry.popular_files(10);
        assert_eq!(
            popular,
            vec![
                (String::from("hot.txt"), 10),
                (String::from("warm.txt"), 5)
            ]
        );
    }
}
