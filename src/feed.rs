use crate::aggregate::{AggregateQuery, AggregationEngine, AggregationSnapshot};
use crate::report::Report;
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("aggregation worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Newest report set available on `rx`, starting from `current`.
/// Older sets still queued are dropped unseen.
pub fn newest(rx: &Receiver<Vec<Report>>, mut current: Vec<Report>) -> (Vec<Report>, usize) {
    let mut skipped = 0;
    while let Ok(next) = rx.try_recv() {
        current = next;
        skipped += 1;
    }
    (current, skipped)
}

/// Background worker turning "report set changed" pushes into snapshots.
pub struct AggregationFeed {
    handle: JoinHandle<usize>,
}

impl AggregationFeed {
    /// `query` is evaluated per push so relative ranges track the clock.
    /// The worker exits once every sender of `rx` is gone.
    pub fn spawn<Q, F>(
        rx: Receiver<Vec<Report>>,
        engine: AggregationEngine,
        query: Q,
        mut on_snapshot: F,
    ) -> Self
    where
        Q: Fn() -> AggregateQuery + Send + 'static,
        F: FnMut(AggregationSnapshot) + Send + 'static,
    {
        let handle = std::thread::spawn(move || {
            let mut computed = 0usize;
            while let Ok(first) = rx.recv() {
                let (reports, skipped) = newest(&rx, first);
                if skipped > 0 {
                    debug!(skipped, "superseded report sets discarded");
                }
                on_snapshot(engine.aggregate(&reports, &query()));
                computed += 1;
            }
            computed
        });
        Self { handle }
    }

    /// Waits for the worker; returns how many snapshots it produced.
    pub fn join(self) -> Result<usize, FeedError> {
        self.handle.join().map_err(|panic| {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            FeedError::WorkerPanicked(msg)
        })
    }
}
