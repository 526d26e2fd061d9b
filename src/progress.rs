//! Progress reporting for the collection phases.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Phases that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Walking the category directories for index files.
    Discover,
    /// Parsing index files.
    Metadata,
    /// Listing chunk shards.
    Blobs,
    /// Removing garbage chunks.
    Delete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discover => "metadata files",
            Phase::Metadata => "metadata",
            Phase::Blobs => "blobs",
            Phase::Delete => "delete",
        }
    }

    fn slot(&self) -> usize {
        match self {
            Phase::Discover => 0,
            Phase::Metadata => 1,
            Phase::Blobs => 2,
            Phase::Delete => 3,
        }
    }
}

/// Receives increment events from the workers of each phase.
pub trait Progress: Send + Sync {
    /// A phase is starting with `total` units of work.
    fn begin(&self, phase: Phase, total: u64);

    /// `n` units of work completed.
    fn inc(&self, phase: Phase, n: u64);

    /// All workers of the phase have finished.
    fn finish(&self, phase: Phase);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _phase: Phase, _total: u64) {}
    fn inc(&self, _phase: Phase, _n: u64) {}
    fn finish(&self, _phase: Phase) {}
}

#[derive(Default)]
struct Counter {
    total: AtomicU64,
    done: AtomicU64,
    /// Last logged step, in tenths.
    logged: Mutex<u64>,
}

/// Logs every tenth of a phase through `tracing`.
#[derive(Default)]
pub struct LogProgress {
    counters: [Counter; 4],
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units completed so far in `phase`.
    pub fn done(&self, phase: Phase) -> u64 {
        self.counters[phase.slot()].done.load(Ordering::Relaxed)
    }
}

impl Progress for LogProgress {
    fn begin(&self, phase: Phase, total: u64) {
        let counter = &self.counters[phase.slot()];
        counter.total.store(total, Ordering::Relaxed);
        counter.done.store(0, Ordering::Relaxed);
        *counter.logged.lock() = 0;
        info!("{}: 0 / {}", phase.as_str(), total);
    }

    fn inc(&self, phase: Phase, n: u64) {
        let counter = &self.counters[phase.slot()];
        let done = counter.done.fetch_add(n, Ordering::Relaxed) + n;
        let total = counter.total.load(Ordering::Relaxed);
        if total == 0 {
            return;
        }
        let step = done.min(total) * 10 / total;
        let mut logged = counter.logged.lock();
        if step > *logged {
            *logged = step;
            info!("{}: {} / {} ({}%)", phase.as_str(), done, total, step * 10);
        }
    }

    fn finish(&self, phase: Phase) {
        let counter = &self.counters[phase.slot()];
        info!(
            "{}: finished {} / {}",
            phase.as_str(),
            counter.done.load(Ordering::Relaxed),
            counter.total.load(Ordering::Relaxed)
        );
    }
}
