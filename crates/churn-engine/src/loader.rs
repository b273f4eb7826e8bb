//! JSON-lines event source adapter.
//!
//! The input file carries one commit event per line:
//!
//! ```text
//! {"date": 1217695564000, "author": "gniemeyer", "filename": "trunk/src/code_swarm.java", "weight": 3}
//! ```
//!
//! Loading streams lines straight into the ingestion queue. Any
//! failure (unreadable file, undecodable line, ordering violation)
//! poisons the queue so the consumer stops with the same diagnosis
//! instead of starving forever.

use std::path::Path;

use churn_core::queue::EventQueue;
use churn_types::CommitEvent;
use tokio::io::AsyncBufReadExt;

use crate::error::EngineError;

/// Load every event from a JSON-lines file into the queue, then close
/// it. Blank lines are skipped. Returns the number of events pushed.
///
/// # Errors
///
/// Returns [`EngineError::Io`] when the file cannot be read,
/// [`EngineError::Decode`] for an invalid line, and
/// [`EngineError::Queue`] when the queue rejects a push (ordering
/// violation in sorted mode). The queue is poisoned before any error
/// return.
pub async fn load_events(path: &Path, queue: &EventQueue) -> Result<usize, EngineError> {
    let path_text = path.display().to_string();
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(source) => {
            queue
                .fail(format!("cannot open event input '{path_text}': {source}"))
                .await;
            return Err(EngineError::Io(source));
        }
    };

    let mut lines = tokio::io::BufReader::new(file).lines();
    let mut line_number = 0_usize;
    let mut pushed = 0_usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(source) => {
                queue
                    .fail(format!("read failure in '{path_text}': {source}"))
                    .await;
                return Err(EngineError::Io(source));
            }
        };
        line_number = line_number.saturating_add(1);
        if line.trim().is_empty() {
            continue;
        }

        let event: CommitEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(source) => {
                queue
                    .fail(format!(
                        "invalid event at {path_text}:{line_number}: {source}"
                    ))
                    .await;
                return Err(EngineError::Decode {
                    path: path_text,
                    line: line_number,
                    source,
                });
            }
        };

        if let Err(source) = queue.push(event).await {
            queue
                .fail(format!("rejected event at {path_text}:{line_number}: {source}"))
                .await;
            return Err(EngineError::Queue(source));
        }
        pushed = pushed.saturating_add(1);
    }

    queue.close().await;
    tracing::info!(path = path_text, events = pushed, "event input loaded");
    Ok(pushed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use chrono::{TimeZone, Utc};
    use churn_core::queue::QueueError;

    use super::*;

    fn input_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn loads_events_and_closes_the_queue() {
        let file = input_file(concat!(
            r#"{"date": 100, "author": "alice", "filename": "a.txt", "weight": 2}"#,
            "\n\n",
            r#"{"date": 200, "author": "bob", "filename": "b.txt"}"#,
            "\n",
        ));
        let queue = EventQueue::unsorted();

        let pushed = load_events(file.path(), &queue).await.unwrap();
        assert_eq!(pushed, 2);

        let deadline = Utc.timestamp_millis_opt(1_000).unwrap();
        let first = queue.take_due(deadline).await.unwrap().unwrap();
        assert_eq!(first.filename, "a.txt");
        assert_eq!(first.weight, 2);
        let second = queue.take_due(deadline).await.unwrap().unwrap();
        // Weight defaults to 1 when absent.
        assert_eq!(second.weight, 1);
        assert!(queue.is_exhausted().await);
    }

    #[tokio::test]
    async fn invalid_line_fails_with_position() {
        let file = input_file(concat!(
            r#"{"date": 100, "author": "alice", "filename": "a.txt"}"#,
            "\n",
            "not json\n",
        ));
        let queue = EventQueue::unsorted();

        let result = load_events(file.path(), &queue).await;
        assert!(matches!(result, Err(EngineError::Decode { line: 2, .. })));
        // The consumer side sees the poisoning, not a silent stall.
        let deadline = Utc.timestamp_millis_opt(1_000).unwrap();
        assert!(matches!(
            queue.take_due(deadline).await,
            Err(QueueError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn ordering_violation_aborts_a_sorted_load() {
        let file = input_file(concat!(
            r#"{"date": 200, "author": "alice", "filename": "a.txt"}"#,
            "\n",
            r#"{"date": 100, "author": "alice", "filename": "b.txt"}"#,
            "\n",
        ));
        let queue = EventQueue::sorted(8);

        let result = load_events(file.path(), &queue).await;
        assert!(matches!(
            result,
            Err(EngineError::Queue(QueueError::OutOfOrder { .. }))
        ));
    }

    #[tokio::test]
    async fn missing_file_poisons_the_queue() {
        let queue = EventQueue::sorted(8);
        let result = load_events(Path::new("/nonexistent/events.jsonl"), &queue).await;
        assert!(matches!(result, Err(EngineError::Io(_))));
        let deadline = Utc.timestamp_millis_opt(1_000).unwrap();
        assert!(matches!(
            queue.take_due(deadline).await,
            Err(QueueError::Failed(_))
        ));
    }
}
