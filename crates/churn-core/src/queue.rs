//! The event ingestion queue between the loader and the frame loop.
//!
//! Two modes share one API. In *sorted* mode the producer promises
//! non-decreasing timestamps; the queue is a bounded FIFO that blocks
//! the producer at capacity and rejects any timestamp regression as a
//! protocol violation. In *unsorted* mode the queue is an unbounded
//! min-heap on (timestamp, arrival order) and the producer loads the
//! whole input before consumption starts, so the heap head is always
//! the globally earliest event.
//!
//! The consumer suspends on [`EventQueue::take_due`] until the queue
//! can *decide* whether an event is due, never by polling in a loop.
//! There is exactly one producer and one consumer.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use chrono::{DateTime, Utc};
use churn_types::CommitEvent;
use tokio::sync::{Mutex, Notify};

/// Default producer-side capacity for sorted mode.
pub const DEFAULT_CAPACITY: usize = 5_000;

/// Errors surfaced by queue operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// A sorted-mode push regressed below the highest timestamp seen.
    #[error("out-of-order event: {timestamp} after {max_seen} (input claims sorted)")]
    OutOfOrder {
        /// Timestamp of the offending event.
        timestamp: DateTime<Utc>,
        /// Highest timestamp accepted so far.
        max_seen: DateTime<Utc>,
    },
    /// A push after [`EventQueue::close`].
    #[error("push to a closed event queue")]
    Closed,
    /// The producer marked the stream failed; consumption must stop.
    #[error("event stream failed: {0}")]
    Failed(String),
}

/// Heap entry ordered by (timestamp, arrival sequence).
#[derive(Debug)]
struct Queued {
    timestamp: DateTime<Utc>,
    seq: u64,
    event: CommitEvent,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug)]
enum Store {
    Sorted(VecDeque<CommitEvent>),
    Unsorted(BinaryHeap<Reverse<Queued>>),
}

impl Store {
    fn len(&self) -> usize {
        match self {
            Self::Sorted(fifo) => fifo.len(),
            Self::Unsorted(heap) => heap.len(),
        }
    }

    fn head_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Sorted(fifo) => fifo.front().map(|event| event.timestamp),
            Self::Unsorted(heap) => heap.peek().map(|entry| entry.0.timestamp),
        }
    }

    fn pop(&mut self) -> Option<CommitEvent> {
        match self {
            Self::Sorted(fifo) => fifo.pop_front(),
            Self::Unsorted(heap) => heap.pop().map(|entry| entry.0.event),
        }
    }
}

#[derive(Debug)]
struct Inner {
    store: Store,
    closed: bool,
    failure: Option<String>,
    max_seen: Option<DateTime<Utc>>,
    next_seq: u64,
}

/// The shared ingestion queue. See the module docs for the contract.
#[derive(Debug)]
pub struct EventQueue {
    inner: Mutex<Inner>,
    /// Sorted-mode producer bound; unbounded in unsorted mode.
    capacity: Option<usize>,
    /// Signals the consumer: new head, close, or failure.
    ready: Notify,
    /// Signals the producer: capacity freed or queue torn down.
    space: Notify,
}

impl EventQueue {
    /// A bounded FIFO for timestamp-sorted input.
    pub fn sorted(capacity: usize) -> Self {
        Self::build(Store::Sorted(VecDeque::new()), Some(capacity.max(1)))
    }

    /// An unbounded reordering heap for unsorted input.
    pub fn unsorted() -> Self {
        Self::build(Store::Unsorted(BinaryHeap::new()), None)
    }

    fn build(store: Store, capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                closed: false,
                failure: None,
                max_seen: None,
                next_seq: 0,
            }),
            capacity,
            ready: Notify::new(),
            space: Notify::new(),
        }
    }

    /// Enqueue one event, suspending while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// [`QueueError::OutOfOrder`] when a sorted-mode timestamp
    /// regresses, [`QueueError::Closed`] after `close`, and
    /// [`QueueError::Failed`] once the stream has been failed.
    pub async fn push(&self, event: CommitEvent) -> Result<(), QueueError> {
        loop {
            {
                let mut guard = self.inner.lock().await;
                let inner = &mut *guard;
                if let Some(reason) = &inner.failure {
                    return Err(QueueError::Failed(reason.clone()));
                }
                if inner.closed {
                    return Err(QueueError::Closed);
                }
                let at_capacity = self
                    .capacity
                    .is_some_and(|capacity| inner.store.len() >= capacity);
                if !at_capacity {
                    if let Some(max_seen) = inner.max_seen {
                        if matches!(inner.store, Store::Sorted(_)) && event.timestamp < max_seen {
                            return Err(QueueError::OutOfOrder {
                                timestamp: event.timestamp,
                                max_seen,
                            });
                        }
                    }
                    if inner.max_seen.is_none_or(|seen| event.timestamp > seen) {
                        inner.max_seen = Some(event.timestamp);
                    }
                    match &mut inner.store {
                        Store::Sorted(fifo) => fifo.push_back(event),
                        Store::Unsorted(heap) => {
                            let seq = inner.next_seq;
                            inner.next_seq = inner.next_seq.wrapping_add(1);
                            heap.push(Reverse(Queued {
                                timestamp: event.timestamp,
                                seq,
                                event,
                            }));
                        }
                    }
                    self.ready.notify_one();
                    return Ok(());
                }
            }
            self.space.notified().await;
        }
    }

    /// Mark the producer finished. Idempotent.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        drop(inner);
        self.ready.notify_one();
        self.space.notify_one();
    }

    /// Poison the queue: the consumer's next `take_due` fails with the
    /// given reason and the producer side is released.
    pub async fn fail(&self, reason: String) {
        let mut inner = self.inner.lock().await;
        inner.failure = Some(reason);
        inner.closed = true;
        drop(inner);
        self.ready.notify_one();
        self.space.notify_one();
    }

    /// Take the next event if its timestamp is strictly before the
    /// deadline.
    ///
    /// Suspends while the answer is undecidable (queue open but empty
    /// or, in unsorted mode, still loading). Resolves to `None` when
    /// the head is not yet due or the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// [`QueueError::Failed`] once the stream has been failed.
    pub async fn take_due(
        &self,
        deadline: DateTime<Utc>,
    ) -> Result<Option<CommitEvent>, QueueError> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(reason) = &inner.failure {
                    return Err(QueueError::Failed(reason.clone()));
                }
                // Unsorted heads are only trustworthy once loading is
                // complete.
                let decidable = inner.closed
                    || matches!(inner.store, Store::Sorted(_)) && inner.store.len() > 0;
                if decidable {
                    match inner.store.head_timestamp() {
                        Some(head) if head < deadline => {
                            let event = inner.store.pop();
                            drop(inner);
                            self.space.notify_one();
                            return Ok(event);
                        }
                        _ => return Ok(None),
                    }
                }
            }
            self.ready.notified().await;
        }
    }

    /// The earliest pending event, without removing it, if the head is
    /// decidable right now.
    ///
    /// Returns `None` while the answer is unknowable (unsorted mode
    /// still loading) as well as when the queue is simply empty; it
    /// never suspends.
    pub async fn try_peek(&self) -> Option<CommitEvent> {
        let inner = self.inner.lock().await;
        let decidable = inner.closed || matches!(inner.store, Store::Sorted(_));
        if !decidable {
            return None;
        }
        match &inner.store {
            Store::Sorted(fifo) => fifo.front().cloned(),
            Store::Unsorted(heap) => heap.peek().map(|entry| entry.0.event.clone()),
        }
    }

    /// Wait for the first event and return its timestamp, or `None`
    /// when the stream closes without ever producing one.
    ///
    /// Used to align the simulation clock with the input before the
    /// first frame.
    pub async fn first_timestamp(&self) -> Result<Option<DateTime<Utc>>, QueueError> {
        loop {
            {
                let inner = self.inner.lock().await;
                if let Some(reason) = &inner.failure {
                    return Err(QueueError::Failed(reason.clone()));
                }
                let loaded = inner.closed || matches!(inner.store, Store::Sorted(_));
                if loaded {
                    if let Some(head) = inner.store.head_timestamp() {
                        return Ok(Some(head));
                    }
                    if inner.closed {
                        return Ok(None);
                    }
                }
            }
            self.ready.notified().await;
        }
    }

    /// Whether the producer has finished and every event was consumed.
    pub async fn is_exhausted(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.closed && inner.store.len() == 0
    }
}
