//! Error types for the engine binary.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! pipeline: configuration, event loading, the frame loop, and
//! snapshot persistence.

use churn_core::config::ConfigError;
use churn_core::frame::FrameError;
use churn_core::physics::PhysicsError;
use churn_core::queue::QueueError;

/// Errors that can occur while running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Physics strategies could not be constructed or selected.
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// The event input could not be read.
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),

    /// An input line was not a valid event.
    #[error("invalid event at {path}:{line}: {source}")]
    Decode {
        /// The input file.
        path: String,
        /// 1-based line number of the offending line.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The ingestion queue rejected an event.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The frame loop aborted.
    #[error("frame loop error: {0}")]
    Frame(#[from] FrameError),

    /// The event loader task panicked or was cancelled.
    #[error("loader task failed: {0}")]
    LoaderTask(String),
}
