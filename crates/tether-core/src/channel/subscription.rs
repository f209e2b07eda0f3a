use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use super::{Shared, Slot};
use crate::domain::EventRecord;

/// Lazy, finite stream of a job's events: backlog first, then live records,
/// ending once the channel is closed.
pub type EventStream = BoxStream<'static, EventRecord>;

/// Independent read cursor over an event channel.
///
/// Always starts at `seq = 0`. Never skips or reorders records.
pub struct EventSubscription {
    shared: Arc<Shared>,
    cursor: usize,
}

impl EventSubscription {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared, cursor: 0 }
    }

    /// Next record, or `None` once the channel is closed and fully read.
    ///
    /// Cancel-safe: the cursor only advances when a record is returned.
    pub async fn next(&mut self) -> Option<EventRecord> {
        loop {
            // 先に waiter を登録してから log を見る（publish との取りこぼし防止）
            let notified = self.shared.notify().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.shared.slot(self.cursor) {
                Slot::Record(record) => {
                    self.cursor += 1;
                    return Some(record);
                }
                Slot::Closed => return None,
                Slot::Empty => notified.await,
            }
        }
    }

    pub fn into_stream(self) -> EventStream {
        futures::stream::unfold(self, |mut sub| async move {
            let record = sub.next().await?;
            Some((record, sub))
        })
        .boxed()
    }
}
