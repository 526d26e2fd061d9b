//! Sweep phase: removes the chunks named in the garbage list.

use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{GcError, GcResult};
use crate::models::DeleteStats;
use crate::pool::run_partitioned;
use crate::progress::{Phase, Progress};

/// Removes files from a fixed list with a pool of workers.
///
/// Individual failures are counted and logged but never stop the sweep. Only
/// cancellation (operator interrupt) ends it early; the partial counts are
/// then returned with `interrupted` set.
pub struct Deleter {
    workers: usize,
    progress: Arc<dyn Progress>,
}

impl Deleter {
    pub fn new(workers: usize, progress: Arc<dyn Progress>) -> Self {
        Self { workers, progress }
    }

    pub async fn delete(
        &self,
        garbage: Arc<Vec<PathBuf>>,
        cancel: &CancellationToken,
    ) -> GcResult<DeleteStats> {
        let stats = Arc::new(Mutex::new(DeleteStats::default()));
        self.progress.begin(Phase::Delete, garbage.len() as u64);

        let shared = Arc::clone(&stats);
        let files = Arc::clone(&garbage);
        let progress = Arc::clone(&self.progress);
        let outcome = run_partitioned(garbage.len(), self.workers, cancel, move |range, cancel| {
            let mut local = DeleteStats::default();
            for path in &files[range] {
                if cancel.is_cancelled() {
                    shared.lock().merge(&local);
                    return Err(GcError::cancelled());
                }
                match std::fs::remove_file(path) {
                    Ok(()) => local.removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => local.missing += 1,
                    Err(e) => {
                        warn!("Failed to remove {}: {}", path.display(), e);
                        local.failed += 1;
                    }
                }
                progress.inc(Phase::Delete, 1);
            }
            shared.lock().merge(&local);
            Ok(())
        })
        .await;

        let mut stats = *stats.lock();
        if let Err(e) = outcome {
            warn!(
                "Sweep stopped after {} of {} files: {} removed, {} already gone, {} failed",
                stats.attempted(),
                garbage.len(),
                stats.removed,
                stats.missing,
                stats.failed
            );
            if !e.is_cancelled() {
                return Err(e);
            }
            stats.interrupted = true;
            return Ok(stats);
        }
        self.progress.finish(Phase::Delete);

        info!(
            "Removed {} chunks ({} already gone, {} failed)",
            stats.removed, stats.missing, stats.failed
        );
        Ok(stats)
    }
}
