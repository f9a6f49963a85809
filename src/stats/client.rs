//! Fire-and-forget stats emission.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::StatsSettings;
use crate::stats::worker::{Event, StatsWorker};

/// Queue depth between emitters and the worker. `try_send` drops events
/// on a full queue rather than back-pressuring request handling.
const QUEUE_DEPTH: usize = 1024;

/// Cheap, cloneable handle for emitting stats events.
#[derive(Debug, Clone)]
pub struct StatsClient {
    tx: mpsc::Sender<Event>,
}

impl StatsClient {
    /// Count one occurrence of `bucket`.
    pub fn incr(&self, bucket: &str) {
        self.count(bucket, 1);
    }

    /// Add `delta` occurrences of `bucket`.
    pub fn count(&self, bucket: &str, delta: i64) {
        self.emit(Event::Count {
            bucket: bucket.to_string(),
            delta,
        });
    }

    /// Record an elapsed time under `bucket`, in milliseconds.
    pub fn timing(&self, bucket: &str, elapsed: Duration) {
        self.emit(Event::Timing {
            bucket: bucket.to_string(),
            millis: elapsed.as_millis() as u64,
        });
    }

    fn emit(&self, event: Event) {
        if self.tx.try_send(event).is_err() {
            tracing::trace!("Stats queue full, dropping event");
        }
    }
}

/// Create a connected client/worker pair for `settings`.
///
/// The worker must be spawned for events to reach the collector; the
/// client works either way and simply drops into the void otherwise.
pub fn channel(settings: StatsSettings) -> (StatsClient, StatsWorker) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    (StatsClient { tx }, StatsWorker::new(settings, rx))
}
