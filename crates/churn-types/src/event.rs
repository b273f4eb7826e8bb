//! The canonical commit event record.
//!
//! The event source adapter decodes a repository log (whatever its
//! on-disk syntax) into a sequence of [`CommitEvent`] values. The core
//! only ever sees this shape. Timestamps are wire-encoded as epoch
//! milliseconds, matching the common repository-log export format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One author-touches-file occurrence decoded from a repository log.
///
/// Immutable once constructed; produced by the event source adapter
/// and consumed exactly once by the simulation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    /// When the touch happened.
    #[serde(rename = "date", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The committer's name.
    pub author: String,

    /// Full path and name of the touched file.
    pub filename: String,

    /// Magnitude of the touch (e.g. lines changed), at least 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_weight() -> u32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_from_json_line() {
        let line = r#"{"date": 1215000000000, "author": "alice", "filename": "src/lib.rs", "weight": 3}"#;
        let event: CommitEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.author, "alice");
        assert_eq!(event.filename, "src/lib.rs");
        assert_eq!(event.weight, 3);
        assert_eq!(event.timestamp.timestamp_millis(), 1_215_000_000_000);
    }

    #[test]
    fn weight_defaults_to_one() {
        let line = r#"{"date": 0, "author": "bob", "filename": "README"}"#;
        let event: CommitEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.weight, 1);
    }
}
