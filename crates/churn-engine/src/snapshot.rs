//! Background persistence of per-frame summaries.
//!
//! Frame summaries are appended as JSON lines by a small pool of
//! background workers behind a bounded work queue, so a slow disk
//! never stalls the frame loop outright. When the queue is saturated,
//! `submit` writes on the caller instead of dropping the frame: the
//! loop slows down rather than losing history.

use std::path::Path;
use std::sync::Arc;

use churn_core::frame::FrameSummary;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::EngineError;

/// Bounded background writer pool for frame summaries.
pub struct SnapshotPool {
    sender: mpsc::Sender<FrameSummary>,
    workers: Vec<JoinHandle<()>>,
    writer: Arc<Mutex<tokio::fs::File>>,
}

impl SnapshotPool {
    /// Open (or create) the output file and start the workers.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] when the file cannot be opened.
    pub async fn create(
        path: &Path,
        workers: usize,
        capacity: usize,
    ) -> Result<Self, EngineError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let writer = Arc::new(Mutex::new(file));

        let (sender, receiver) = mpsc::channel::<FrameSummary>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let writer = Arc::clone(&writer);
                tokio::spawn(async move {
                    loop {
                        let next = {
                            let mut receiver = receiver.lock().await;
                            receiver.recv().await
                        };
                        match next {
                            Some(summary) => persist(&writer, &summary).await,
                            None => break,
                        }
                    }
                })
            })
            .collect();

        Ok(Self {
            sender,
            workers,
            writer,
        })
    }

    /// Hand a summary to the pool, writing it on the caller when the
    /// work queue is saturated.
    pub async fn submit(&self, summary: FrameSummary) {
        match self.sender.try_send(summary) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(summary)) => {
                tracing::debug!(frame = summary.frame, "snapshot queue full, writing inline");
                persist(&self.writer, &summary).await;
            }
            Err(mpsc::error::TrySendError::Closed(summary)) => {
                // Shutdown already started; keep the frame anyway.
                persist(&self.writer, &summary).await;
            }
        }
    }

    /// Finish queued work and flush the file.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            if let Err(source) = worker.await {
                tracing::error!(error = %source, "snapshot worker failed");
            }
        }
        let mut writer = self.writer.lock().await;
        if let Err(source) = writer.flush().await {
            tracing::error!(error = %source, "snapshot flush failed");
        }
    }
}

/// Append one summary as a JSON line. Worker context, so failures are
/// logged rather than propagated.
async fn persist(writer: &Mutex<tokio::fs::File>, summary: &FrameSummary) {
    let mut line = match serde_json::to_string(summary) {
        Ok(line) => line,
        Err(source) => {
            tracing::error!(frame = summary.frame, error = %source, "snapshot encode failed");
            return;
        }
    };
    line.push('\n');

    let mut writer = writer.lock().await;
    if let Err(source) = writer.write_all(line.as_bytes()).await {
        tracing::error!(frame = summary.frame, error = %source, "snapshot write failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use churn_types::SimulationPhase;

    use super::*;

    fn summary(frame: u64) -> FrameSummary {
        FrameSummary {
            frame,
            phase: SimulationPhase::Running,
            events_applied: 3,
            alive_files: 2,
            alive_people: 1,
            alive_edges: 2,
            simulated_time: Utc.timestamp_millis_opt(1_000).unwrap(),
            strategy: String::from("simple"),
        }
    }

    #[tokio::test]
    async fn every_submitted_frame_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");

        let pool = SnapshotPool::create(&path, 2, 2).await.unwrap();
        for frame in 1..=20 {
            pool.submit(summary(frame)).await;
        }
        pool.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["phase"], "running");
            assert_eq!(value["simulated_time"], 1_000);
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_queued_work() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");

        let pool = SnapshotPool::create(&path, 1, 16).await.unwrap();
        for frame in 1..=5 {
            pool.submit(summary(frame)).await;
        }
        // No sleep: shutdown itself must drain the queue.
        pool.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }
}
