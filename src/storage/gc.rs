//! Mark-and-sweep garbage collection of unreferenced chunks.

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::blob_scan::{BlobEnumerator, BlobSet};
use super::delete::Deleter;
use super::index_scan::{IndexScanner, LiveSet, MarkResult};
use super::layout::Datastore;
use super::report::{report_file_name, write_report, write_summary};
use crate::config::Config;
use crate::error::GcResult;
use crate::models::{Digest, GcSummary};
use crate::progress::{LogProgress, Progress};

/// Live and present chunks, gathered before any sweep decision.
#[derive(Debug)]
pub struct ScanResult {
    pub mark: MarkResult,
    pub blobs: BlobSet,
}

/// Paths of every chunk in `blobs` that is not in `live`, sorted.
///
/// Pure function of its inputs; the order does not depend on how the sets
/// were produced.
pub fn garbage_list(store: &Datastore, live: &LiveSet, blobs: &[Digest]) -> Vec<PathBuf> {
    let mut garbage: Vec<PathBuf> = blobs
        .iter()
        .filter(|digest| !live.contains(*digest))
        .map(|digest| store.chunk_path(digest))
        .collect();
    garbage.sort_unstable_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    garbage
}

/// Garbage collector for a single datastore.
pub struct GarbageCollector {
    config: Arc<Config>,
    store: Datastore,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,
}

impl GarbageCollector {
    pub fn new(config: Config) -> Self {
        Self::with_progress(config, Arc::new(LogProgress::new()))
    }

    pub fn with_progress(config: Config, progress: Arc<dyn Progress>) -> Self {
        let store = Datastore::new(config.base_dir.clone());
        Self {
            config: Arc::new(config),
            store,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the mark and collect phases concurrently.
    ///
    /// Either phase failing cancels the other. Both are awaited to the end, so
    /// no worker is still touching the store when this returns.
    pub async fn scan(&self) -> GcResult<ScanResult> {
        let scanner = IndexScanner::new(
            self.store.clone(),
            self.config.metadata_workers,
            Arc::clone(&self.progress),
        );
        let enumerator = BlobEnumerator::new(
            self.store.clone(),
            self.config.blobs_workers,
            Arc::clone(&self.progress),
        );

        let cancel = &self.cancel;
        let (mark, blobs) = tokio::join!(
            async {
                let result = scanner.scan(cancel).await;
                if result.is_err() {
                    cancel.cancel();
                }
                result
            },
            async {
                let result = enumerator.enumerate(cancel).await;
                if result.is_err() {
                    cancel.cancel();
                }
                result
            },
        );
        let (mark, blobs) = match (mark, blobs) {
            (Ok(mark), Ok(blobs)) => (mark, blobs),
            // report the root cause, not the sibling's cancellation
            (Err(a), Err(b)) if a.is_cancelled() => return Err(b),
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };
        info!(
            "all collecting finished, index {}, blobs: {}",
            mark.live.len(),
            blobs.len()
        );
        Ok(ScanResult { mark, blobs })
    }

    /// Scans, writes the report and sweeps if the configuration asks for it.
    pub async fn run(&self) -> GcResult<GcSummary> {
        let started = Instant::now();
        let scan = self.scan().await?;

        let garbage = garbage_list(&self.store, &scan.mark.live, &scan.blobs);
        info!("{} files should be deleted", garbage.len());

        let report_path = write_report(
            &self.config.report_dir,
            &report_file_name(Local::now()),
            &garbage,
        )
        .await?;
        let scan_elapsed = started.elapsed();
        info!("scan finished using {:?}", scan_elapsed);

        let mut summary = GcSummary {
            live_digests: scan.mark.live.len(),
            index_files: scan.mark.index_files,
            blobs_found: scan.blobs.len(),
            garbage_found: garbage.len(),
            report_path,
            scan_elapsed,
            deleted: None,
            delete_elapsed: Duration::ZERO,
        };
        drop(scan);

        if self.config.delete {
            let started = Instant::now();
            let deleter = Deleter::new(self.config.delete_workers, Arc::clone(&self.progress));
            let stats = deleter.delete(Arc::new(garbage), &self.cancel).await?;
            summary.deleted = Some(stats);
            summary.delete_elapsed = started.elapsed();
            if stats.interrupted {
                warn!("deletion interrupted after {:?}", summary.delete_elapsed);
            } else {
                info!("all files deleted, using {:?}", summary.delete_elapsed);
            }
        }

        if self.config.summary_json {
            write_summary(&summary.report_path, &summary).await?;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DIGEST_LEN;
    use std::collections::HashSet;

    fn digest(first: u8, fill: u8) -> Digest {
        let mut bytes = [fill; DIGEST_LEN];
        bytes[0] = first;
        Digest::new(bytes)
    }

    #[test]
    fn test_garbage_is_present_minus_live() {
        let store = Datastore::new("/srv/store");
        let a = digest(0x10, 1);
        let b = digest(0x20, 2);
        let c = digest(0x05, 3);
        let d = digest(0xf0, 4);
        let live: LiveSet = HashSet::from([a, b]);

        let garbage = garbage_list(&store, &live, &[d, a, c, b]);
        assert_eq!(garbage, vec![store.chunk_path(&c), store.chunk_path(&d)]);
    }

    #[test]
    fn test_live_digest_without_blob_is_ignored() {
        let store = Datastore::new("/srv/store");
        let live: LiveSet = HashSet::from([digest(1, 1)]);
        assert!(garbage_list(&store, &live, &[]).is_empty());
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let store = Datastore::new("/srv/store");
        let blobs: Vec<Digest> = (0..50u8).map(|n| digest(n.wrapping_mul(37), n)).collect();
        let live: LiveSet = blobs.iter().step_by(3).copied().collect();

        let mut reversed = blobs.clone();
        reversed.reverse();
        assert_eq!(
            garbage_list(&store, &live, &blobs),
            garbage_list(&store, &live, &reversed)
        );
    }
}
