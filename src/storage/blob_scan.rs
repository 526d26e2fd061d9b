//! Collect phase: enumerates every chunk present in the store.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::layout::{Datastore, SHARD_COUNT};
use crate::error::{ErrorCode, GcError, GcResult};
use crate::models::Digest;
use crate::pool::run_partitioned;
use crate::progress::{Phase, Progress};

/// Digests found on disk, in no particular order.
pub type BlobSet = Vec<Digest>;

/// Lists all 65536 shard directories of the chunk store.
#[derive(Clone)]
pub struct BlobEnumerator {
    store: Datastore,
    workers: usize,
    progress: Arc<dyn Progress>,
}

impl BlobEnumerator {
    pub fn new(store: Datastore, workers: usize, progress: Arc<dyn Progress>) -> Self {
        Self {
            store,
            workers,
            progress,
        }
    }

    /// Returns every chunk of the store.
    ///
    /// Every shard must be listable; a shard that cannot be read fails the
    /// whole enumeration.
    pub async fn enumerate(&self, cancel: &CancellationToken) -> GcResult<BlobSet> {
        let blobs = Arc::new(Mutex::new(BlobSet::new()));
        self.progress.begin(Phase::Blobs, SHARD_COUNT as u64);

        let shared = Arc::clone(&blobs);
        let store = self.store.clone();
        let progress = Arc::clone(&self.progress);
        run_partitioned(SHARD_COUNT, self.workers, cancel, move |range, cancel| {
            let mut local = BlobSet::new();
            for shard in range {
                if cancel.is_cancelled() {
                    return Err(GcError::cancelled());
                }
                list_shard(&store, shard, &mut local)?;
                progress.inc(Phase::Blobs, 1);
            }
            shared.lock().append(&mut local);
            Ok(())
        })
        .await?;
        self.progress.finish(Phase::Blobs);

        let blobs = std::mem::take(&mut *blobs.lock());
        info!("Found {} chunks in {}", blobs.len(), self.store.chunk_dir().display());
        Ok(blobs)
    }
}

/// Appends the chunks of shard `index` to `out`; foreign entries are skipped.
pub fn list_shard(store: &Datastore, index: usize, out: &mut BlobSet) -> GcResult<usize> {
    let dir = store.shard_dir(index);
    let entries = std::fs::read_dir(&dir).map_err(|e| GcError::io(ErrorCode::ShardList, &dir, e))?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| GcError::io(ErrorCode::ShardList, &dir, e))?;
        let name = entry.file_name();
        match name.to_str().and_then(Digest::from_hex) {
            Some(digest) => {
                out.push(digest);
                count += 1;
            }
            None => debug!("Skipping foreign entry {:?} in {}", name, dir.display()),
        }
    }
    Ok(count)
}
