//! Event channel: per-job, append-only, replayable broadcast log.
//!
//! Design:
//! - The log (`Vec<EventRecord>`) is the single source of truth. Subscribers are
//!   independent cursors into it, not consumers of a queue.
//! - Publishing appends under a short lock and wakes waiters via `Notify`.
//!   Nothing ever waits on a subscriber, so a stalled reader cannot stall the task.
//! - `closed` is the terminal marker. After it is set the log never grows.

mod subscription;

pub use subscription::{EventStream, EventSubscription};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::domain::{EventKind, EventRecord};
use crate::ports::Clock;

/// How a channel is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseSignal {
    /// Append a final `completed` record, then close.
    Completed(serde_json::Value),
    /// Append a final `failed` record, then close.
    Failed(serde_json::Value),
    /// Close without appending anything.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("event channel is closed")]
    Closed,

    #[error("terminal event kind {0:?} can only be emitted by close()")]
    TerminalKind(EventKind),
}

#[derive(Default)]
struct Log {
    records: Vec<EventRecord>,
    closed: bool,
}

/// What a cursor finds at its position.
pub(crate) enum Slot {
    Record(EventRecord),
    Closed,
    Empty,
}

pub(crate) struct Shared {
    log: Mutex<Log>,
    notify: Notify,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }

    pub(crate) fn slot(&self, cursor: usize) -> Slot {
        let log = self.log();
        match log.records.get(cursor) {
            Some(record) => Slot::Record(record.clone()),
            None if log.closed => Slot::Closed,
            None => Slot::Empty,
        }
    }

    fn append(&self, log: &mut Log, kind: EventKind, payload: serde_json::Value) -> u64 {
        let seq = log.records.len() as u64;
        log.records.push(EventRecord {
            seq,
            kind,
            payload,
            timestamp: self.clock.now(),
        });
        seq
    }
}

/// Ordered, replayable, multi-subscriber event log for one job.
///
/// Cloning is cheap and yields a handle to the same log.
#[derive(Clone)]
pub struct EventChannel {
    shared: Arc<Shared>,
}

impl EventChannel {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                log: Mutex::new(Log::default()),
                notify: Notify::new(),
                clock,
            }),
        }
    }

    /// Append a non-terminal record and wake every subscriber.
    ///
    /// Returns the assigned `seq`.
    pub fn publish(
        &self,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<u64, PublishError> {
        if kind.is_terminal() {
            return Err(PublishError::TerminalKind(kind));
        }
        let seq = {
            let mut log = self.shared.log();
            if log.closed {
                return Err(PublishError::Closed);
            }
            self.shared.append(&mut log, kind, payload)
        };
        self.shared.notify.notify_waiters();
        Ok(seq)
    }

    /// Close the channel. Only the first call has any effect.
    ///
    /// Returns `true` if this call closed the channel.
    pub fn close(&self, signal: CloseSignal) -> bool {
        {
            let mut log = self.shared.log();
            if log.closed {
                return false;
            }
            match signal {
                CloseSignal::Completed(payload) => {
                    self.shared.append(&mut log, EventKind::Completed, payload);
                }
                CloseSignal::Failed(payload) => {
                    self.shared.append(&mut log, EventKind::Failed, payload);
                }
                CloseSignal::Cancelled => {}
            }
            log.closed = true;
        }
        self.shared.notify.notify_waiters();
        true
    }

    /// New cursor starting at `seq = 0`.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(Arc::clone(&self.shared))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.log().closed
    }

    pub fn len(&self) -> usize {
        self.shared.log().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the backlog so far.
    pub fn backlog(&self) -> Vec<EventRecord> {
        self.shared.log().records.clone()
    }
}
