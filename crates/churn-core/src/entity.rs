//! Entity types and the shared life/decay model.
//!
//! Files, people, and edges all carry a [`Lifespan`]: an integer life
//! value that starts at a configured cap, is reset to the cap whenever
//! the entity is touched ("freshened"), and shrinks by a configured
//! negative decrement once per frame. An entity is *alive* while
//! `life > 0`; at 0 it becomes dormant but is never deleted, so a
//! later touch revives it with its accumulated history intact.
//!
//! Invariant: `0 <= life <= cap` at all times. `decay` floors at 0,
//! `freshen` resets to the cap, and `expire` (registry eviction only)
//! drops straight to 0; no other code path may write `life` directly.

use churn_types::{Rgb, Vec2};

/// Life accounting shared by every entity and edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    /// Current life, in `[0, cap]`.
    life: i32,
    /// The value life resets to on every touch.
    cap: i32,
    /// Per-frame change, strictly negative.
    decrement: i32,
}

impl Lifespan {
    /// Create a lifespan at full life.
    ///
    /// `cap` must be positive and `decrement` negative; callers get
    /// these from validated configuration.
    pub const fn new(cap: i32, decrement: i32) -> Self {
        Self {
            life: cap,
            cap,
            decrement,
        }
    }

    /// Current life value.
    pub const fn life(&self) -> i32 {
        self.life
    }

    /// The configured life cap.
    pub const fn cap(&self) -> i32 {
        self.cap
    }

    /// Whether the owner is currently alive.
    pub const fn is_alive(&self) -> bool {
        self.life > 0
    }

    /// Reset life to the cap, as if newly created.
    pub const fn freshen(&mut self) {
        self.life = self.cap;
    }

    /// Force life to 0, making the owner dormant immediately.
    ///
    /// Called by the registry when an entity is evicted from an alive
    /// list, so dormancy is always visible through `is_alive` no
    /// matter why the eviction happened.
    pub(crate) const fn expire(&mut self) {
        self.life = 0;
    }

    /// Apply one frame of decay, flooring at 0.
    ///
    /// Returns whether the owner is still alive afterwards.
    pub const fn decay(&mut self) -> bool {
        if self.life > 0 {
            self.life = self.life.saturating_add(self.decrement);
            if self.life < 0 {
                self.life = 0;
            }
        }
        self.life > 0
    }
}

/// A file particle.
///
/// Identity is the full path+name string. Created on the first event
/// referencing it; never destroyed, only moved between the alive and
/// dormant views as its life crosses 0.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// Full path and name, the registry key.
    pub name: String,
    /// Current position on the canvas.
    pub position: Vec2,
    /// Current velocity, applied once per frame.
    pub velocity: Vec2,
    /// Mass used by the force-to-velocity conversion.
    pub mass: f32,
    /// Maximum speed; velocity is rescaled down to this each frame.
    pub max_speed: f32,
    /// Life accounting.
    pub lifespan: Lifespan,
    /// Accumulated touch weight. Survives dormancy; floored at 0.
    pub touches: i64,
    /// Hue assigned from the color rules at creation.
    pub hue: Rgb,
}

impl FileNode {
    /// Reset life to the cap and add the event weight to `touches`.
    ///
    /// Touches never go negative: a pathological negative total is
    /// floored at 0. Returns the new touch count so the registry can
    /// maintain the global maximum.
    pub fn freshen(&mut self, weight: u32) -> i64 {
        self.lifespan.freshen();
        self.touches = self.touches.saturating_add(i64::from(weight)).max(0);
        self.touches
    }
}

/// A person (contributor) particle.
#[derive(Debug, Clone)]
pub struct PersonNode {
    /// Author name, the registry key.
    pub name: String,
    /// Current position on the canvas.
    pub position: Vec2,
    /// Current velocity, applied once per frame.
    pub velocity: Vec2,
    /// Mass used by the force-to-velocity conversion.
    pub mass: f32,
    /// Maximum speed; velocity is rescaled down to this each frame.
    pub max_speed: f32,
    /// Life accounting.
    pub lifespan: Lifespan,
    /// Number of touches this person has made (one per event).
    pub touches: i64,
    /// Running blend of every file hue this person has touched.
    pub flavor: Rgb,
    /// How many hues have been blended into `flavor` so far.
    color_samples: u32,
}

impl PersonNode {
    /// Create a person at the given spawn position and velocity.
    pub const fn new(
        name: String,
        position: Vec2,
        velocity: Vec2,
        mass: f32,
        max_speed: f32,
        lifespan: Lifespan,
    ) -> Self {
        Self {
            name,
            position,
            velocity,
            mass,
            max_speed,
            lifespan,
            touches: 1,
            flavor: Rgb::BLACK,
            color_samples: 1,
        }
    }

    /// Reset life to the cap and count one more touch.
    pub const fn freshen(&mut self) {
        self.lifespan.freshen();
        self.touches = self.touches.saturating_add(1);
    }

    /// Blend a touched file's hue into this person's color identity.
    ///
    /// The blend weight is `1 / color_samples`, so the identity is a
    /// running average rather than a discrete choice: early touches
    /// dominate, later ones nudge.
    #[allow(clippy::cast_precision_loss)]
    pub fn add_color(&mut self, hue: Rgb) {
        let t = 1.0 / self.color_samples as f32;
        self.flavor = self.flavor.lerp(hue, t);
        self.color_samples = self.color_samples.saturating_add(1);
    }
}

/// Deterministic composite key for an edge: the unordered pair of its
/// endpoint identities, realized as (file name, person name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    /// The file endpoint's registry key.
    pub file: String,
    /// The person endpoint's registry key.
    pub person: String,
}

impl EdgeKey {
    /// Build the key for a (file, person) pair.
    pub fn new(file: &str, person: &str) -> Self {
        Self {
            file: file.to_owned(),
            person: person.to_owned(),
        }
    }
}

impl core::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} <-> {}", self.file, self.person)
    }
}

/// A spring link between a file and the person who touched it.
///
/// At most one edge exists per (file, person) pair. Refreshed to full
/// life on every touch of that pair; never destroyed once created.
#[derive(Debug, Clone)]
pub struct Edge {
    /// The endpoint pair this edge connects.
    pub key: EdgeKey,
    /// Life accounting.
    pub lifespan: Lifespan,
    /// The spring's preferred length.
    pub rest_length: f32,
}
