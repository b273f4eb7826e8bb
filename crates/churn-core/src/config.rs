//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `churn-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure and provides a loader that reads, parses, and
//! repairs the file. Invalid life values are repaired to defaults with
//! a warning rather than rejected, so a hand-edited config never takes
//! the engine down over a sign error.

use std::path::Path;

use churn_types::Rgb;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `churn-config.yaml`. All fields have
/// defaults, so an absent or empty file yields a runnable engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Event input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Frame timing settings.
    #[serde(default)]
    pub frame: FrameConfig,

    /// Canvas dimensions.
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Entity life caps and decrements.
    #[serde(default)]
    pub life: LifeConfig,

    /// Physics strategies and selection.
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// Color-assignment rules.
    #[serde(default)]
    pub colors: ColorsConfig,

    /// Background frame-snapshot settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.repair();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.repair();
        Ok(config)
    }

    fn repair(&mut self) {
        self.life.repair();
        self.canvas.repair();
        self.physics.repair();
    }
}

/// Event input configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputConfig {
    /// Path to the JSON-lines event file.
    #[serde(default = "default_input_path")]
    pub path: String,

    /// Whether the input promises non-decreasing timestamps.
    ///
    /// Sorted input streams through a bounded queue while frames run;
    /// unsorted input is fully loaded and reordered first.
    #[serde(default)]
    pub sorted: bool,

    /// Producer-side queue bound in sorted mode.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            sorted: false,
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Frame timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameConfig {
    /// How many frames one simulated day spans.
    #[serde(default = "default_frames_per_day")]
    pub frames_per_day: u32,

    /// Explicit simulated milliseconds per frame. Overrides
    /// `frames_per_day` when set.
    #[serde(default)]
    pub millis_per_frame: Option<i64>,

    /// Wall-clock frames per second for loop pacing.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl FrameConfig {
    /// The simulated time one frame covers, in milliseconds.
    pub fn millis_per_frame(&self) -> i64 {
        self.millis_per_frame
            .unwrap_or_else(|| 86_400_000 / i64::from(self.frames_per_day.max(1)))
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_per_day: default_frames_per_day(),
            millis_per_frame: None,
            frame_rate: default_frame_rate(),
        }
    }
}

/// Canvas dimensions, the spawn and clamp bounds for positions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CanvasConfig {
    /// Width in pixels.
    #[serde(default = "default_canvas_width")]
    pub width: f32,

    /// Height in pixels.
    #[serde(default = "default_canvas_height")]
    pub height: f32,
}

impl CanvasConfig {
    /// Replace non-positive dimensions with defaults, warning about
    /// each. Zero-area canvases would collapse spawn and clamp bounds.
    fn repair(&mut self) {
        repair_positive("canvas.width", &mut self.width, default_canvas_width());
        repair_positive("canvas.height", &mut self.height, default_canvas_height());
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
        }
    }
}

/// Life caps and per-frame decrements for each entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifeConfig {
    /// Life cap for files.
    #[serde(default = "default_life_cap")]
    pub file_cap: i32,

    /// Per-frame life change for files, strictly negative.
    #[serde(default = "default_file_decrement")]
    pub file_decrement: i32,

    /// Life cap for people.
    #[serde(default = "default_life_cap")]
    pub person_cap: i32,

    /// Per-frame life change for people, strictly negative.
    #[serde(default = "default_person_decrement")]
    pub person_decrement: i32,

    /// Life cap for edges.
    #[serde(default = "default_life_cap")]
    pub edge_cap: i32,

    /// Per-frame life change for edges, strictly negative.
    #[serde(default = "default_edge_decrement")]
    pub edge_decrement: i32,
}

impl LifeConfig {
    /// Replace invalid values with defaults, warning about each.
    ///
    /// Caps must be positive and decrements negative; anything else
    /// would make entities immortal or stillborn.
    fn repair(&mut self) {
        repair_cap("life.file_cap", &mut self.file_cap);
        repair_cap("life.person_cap", &mut self.person_cap);
        repair_cap("life.edge_cap", &mut self.edge_cap);
        repair_decrement(
            "life.file_decrement",
            &mut self.file_decrement,
            default_file_decrement(),
        );
        repair_decrement(
            "life.person_decrement",
            &mut self.person_decrement,
            default_person_decrement(),
        );
        repair_decrement(
            "life.edge_decrement",
            &mut self.edge_decrement,
            default_edge_decrement(),
        );
    }
}

fn repair_cap(field: &str, value: &mut i32) {
    if *value <= 0 {
        tracing::warn!(field, invalid = *value, fallback = default_life_cap(), "repaired config value");
        *value = default_life_cap();
    }
}

fn repair_decrement(field: &str, value: &mut i32, fallback: i32) {
    if *value >= 0 {
        tracing::warn!(field, invalid = *value, fallback, "repaired config value");
        *value = fallback;
    }
}

fn repair_positive(field: &str, value: &mut f32, fallback: f32) {
    if !value.is_finite() || *value <= 0.0 {
        tracing::warn!(field, invalid = *value, fallback, "repaired config value");
        *value = fallback;
    }
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            file_cap: default_life_cap(),
            file_decrement: default_file_decrement(),
            person_cap: default_life_cap(),
            person_decrement: default_person_decrement(),
            edge_cap: default_life_cap(),
            edge_decrement: default_edge_decrement(),
        }
    }
}

/// Physics strategy list and selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhysicsConfig {
    /// Name of the strategy active at startup.
    #[serde(default = "default_strategy_name")]
    pub selection: String,

    /// Seed for strategy random sources.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// The configured strategies, in switch order.
    #[serde(default = "default_strategies")]
    pub engines: Vec<StrategyConfig>,
}

impl PhysicsConfig {
    fn repair(&mut self) {
        for entry in &mut self.engines {
            entry.repair();
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            selection: default_strategy_name(),
            seed: default_seed(),
            engines: default_strategies(),
        }
    }
}

/// Tunables for one physics strategy instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrategyConfig {
    /// Instance name, used for selection and logging.
    #[serde(default = "default_strategy_name")]
    pub name: String,

    /// Kind in the strategy build table.
    #[serde(default = "default_strategy_kind")]
    pub kind: String,

    /// Spring force multiplier.
    #[serde(default = "default_multiplier")]
    pub edge_multiplier: f32,

    /// Repulsion force multiplier.
    #[serde(default = "default_multiplier")]
    pub node_multiplier: f32,

    /// Force-to-velocity conversion multiplier.
    #[serde(default = "default_multiplier")]
    pub speed_multiplier: f32,

    /// Per-frame velocity damping factor.
    #[serde(default = "default_drag")]
    pub drag: f32,

    /// Preferred spring length for new edges.
    #[serde(default = "default_edge_length")]
    pub edge_length: f32,

    /// File particle mass.
    #[serde(default = "default_file_mass")]
    pub file_mass: f32,

    /// Person particle mass.
    #[serde(default = "default_person_mass")]
    pub person_mass: f32,

    /// File maximum speed.
    #[serde(default = "default_file_speed")]
    pub file_speed: f32,

    /// Person maximum speed.
    #[serde(default = "default_person_speed")]
    pub person_speed: f32,
}

impl StrategyConfig {
    /// Replace invalid masses, speeds, lengths, and drag with
    /// defaults, warning about each. A non-positive mass would make
    /// spawn and force-to-velocity conversion meaningless; drag
    /// outside `[0, 1]` would amplify motion instead of damping it.
    fn repair(&mut self) {
        repair_positive("physics.edge_length", &mut self.edge_length, default_edge_length());
        repair_positive("physics.file_mass", &mut self.file_mass, default_file_mass());
        repair_positive("physics.person_mass", &mut self.person_mass, default_person_mass());
        repair_positive("physics.file_speed", &mut self.file_speed, default_file_speed());
        repair_positive("physics.person_speed", &mut self.person_speed, default_person_speed());
        if !self.drag.is_finite() || !(0.0..=1.0).contains(&self.drag) {
            tracing::warn!(
                field = "physics.drag",
                invalid = self.drag,
                fallback = default_drag(),
                "repaired config value"
            );
            self.drag = default_drag();
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: default_strategy_name(),
            kind: default_strategy_kind(),
            edge_multiplier: default_multiplier(),
            node_multiplier: default_multiplier(),
            speed_multiplier: default_multiplier(),
            drag: default_drag(),
            edge_length: default_edge_length(),
            file_mass: default_file_mass(),
            person_mass: default_person_mass(),
            file_speed: default_file_speed(),
            person_speed: default_person_speed(),
        }
    }
}

/// Color-assignment rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorsConfig {
    /// Ordered rules; first match wins.
    #[serde(default)]
    pub rules: Vec<ColorRuleConfig>,

    /// Legend label for the appended catch-all rule.
    #[serde(default = "default_color_label")]
    pub default_label: String,

    /// Color of the appended catch-all rule.
    #[serde(default = "default_color")]
    pub default_color: Rgb,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_label: default_color_label(),
            default_color: default_color(),
        }
    }
}

/// One configured color rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorRuleConfig {
    /// Legend label.
    pub label: String,

    /// Substring the file identifier must contain.
    pub pattern: String,

    /// The color assigned on match.
    pub color: Rgb,
}

/// Background frame-snapshot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotConfig {
    /// Output path for JSON-lines frame summaries. Disabled when unset.
    #[serde(default)]
    pub path: Option<String>,

    /// Number of background workers.
    #[serde(default = "default_snapshot_workers")]
    pub workers: usize,

    /// Work queue bound before caller-runs backpressure kicks in.
    #[serde(default = "default_snapshot_capacity")]
    pub queue_capacity: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: None,
            workers: default_snapshot_workers(),
            queue_capacity: default_snapshot_capacity(),
        }
    }
}

fn default_input_path() -> String {
    String::from("events.jsonl")
}

const fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_CAPACITY
}

const fn default_frames_per_day() -> u32 {
    4
}

const fn default_frame_rate() -> u32 {
    24
}

const fn default_canvas_width() -> f32 {
    640.0
}

const fn default_canvas_height() -> f32 {
    480.0
}

const fn default_life_cap() -> i32 {
    255
}

const fn default_file_decrement() -> i32 {
    -2
}

const fn default_person_decrement() -> i32 {
    -1
}

const fn default_edge_decrement() -> i32 {
    -2
}

fn default_strategy_name() -> String {
    String::from("simple")
}

fn default_strategy_kind() -> String {
    String::from("simple")
}

const fn default_seed() -> u64 {
    42
}

const fn default_multiplier() -> f32 {
    1.0
}

const fn default_drag() -> f32 {
    0.5
}

const fn default_edge_length() -> f32 {
    25.0
}

const fn default_file_mass() -> f32 {
    1.0
}

const fn default_person_mass() -> f32 {
    10.0
}

const fn default_file_speed() -> f32 {
    7.0
}

const fn default_person_speed() -> f32 {
    2.0
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![StrategyConfig::default()]
}

fn default_color_label() -> String {
    String::from("Everything")
}

const fn default_color() -> Rgb {
    Rgb::GRAY
}

const fn default_snapshot_workers() -> usize {
    2
}

const fn default_snapshot_capacity() -> usize {
    64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineConfig::parse("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.frame.millis_per_frame(), 21_600_000);
        assert_eq!(config.life.file_cap, 255);
        assert_eq!(config.physics.engines.len(), 1);
        assert_eq!(config.physics.engines[0].kind, "simple");
    }

    #[test]
    fn full_yaml_parses() {
        let yaml = r"
input:
  path: data/commits.jsonl
  sorted: true
  queue_capacity: 1000
frame:
  frames_per_day: 8
  frame_rate: 30
canvas:
  width: 1280.0
  height: 720.0
life:
  file_cap: 200
  file_decrement: -4
physics:
  selection: floaty
  seed: 7
  engines:
    - name: floaty
      kind: simple
      drag: 0.9
colors:
  rules:
    - label: Source
      pattern: src/
      color: { r: 255, g: 0, b: 0 }
  default_label: Other
snapshot:
  path: frames.jsonl
  workers: 4
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert!(config.input.sorted);
        assert_eq!(config.frame.millis_per_frame(), 10_800_000);
        assert_eq!(config.life.file_cap, 200);
        assert_eq!(config.life.file_decrement, -4);
        // Unspecified life values keep their defaults.
        assert_eq!(config.life.person_decrement, -1);
        assert_eq!(config.physics.selection, "floaty");
        assert_eq!(config.physics.engines[0].drag, 0.9);
        assert_eq!(config.colors.rules[0].color, Rgb::new(255, 0, 0));
        assert_eq!(config.snapshot.path.as_deref(), Some("frames.jsonl"));
    }

    #[test]
    fn explicit_millis_per_frame_wins() {
        let config = EngineConfig::parse("frame: { millis_per_frame: 500 }").unwrap();
        assert_eq!(config.frame.millis_per_frame(), 500);
    }

    #[test]
    fn invalid_life_values_are_repaired() {
        let yaml = "life: { file_cap: 0, person_decrement: 3 }";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.life.file_cap, 255);
        assert_eq!(config.life.person_decrement, -1);
    }

    #[test]
    fn invalid_physics_and_canvas_values_are_repaired() {
        let yaml = r"
canvas: { width: 0.0, height: -480.0 }
physics:
  engines:
    - name: simple
      file_mass: -1.0
      person_speed: 0.0
      drag: 1.5
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.canvas.width, 640.0);
        assert_eq!(config.canvas.height, 480.0);
        let entry = &config.physics.engines[0];
        assert_eq!(entry.file_mass, 1.0);
        assert_eq!(entry.person_speed, 2.0);
        assert_eq!(entry.drag, 0.5);
        // Valid values pass through untouched.
        assert_eq!(entry.person_mass, 10.0);
    }
}
