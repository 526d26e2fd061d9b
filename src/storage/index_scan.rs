//! Mark phase: collects every digest referenced by a snapshot index.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::layout::Datastore;
use crate::error::{ErrorCode, GcError, GcResult};
use crate::models::{Digest, IndexKind};
use crate::pool::run_partitioned;
use crate::progress::{Phase, Progress};

/// Set of digests still referenced by some snapshot.
pub type LiveSet = HashSet<Digest>;

/// An index file found under one of the category directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    pub path: PathBuf,
    pub kind: IndexKind,
}

/// Result of the mark phase.
#[derive(Debug, Default)]
pub struct MarkResult {
    pub live: LiveSet,
    pub index_files: usize,
}

/// Parses every index file of a datastore into the live set.
#[derive(Clone)]
pub struct IndexScanner {
    store: Datastore,
    workers: usize,
    progress: Arc<dyn Progress>,
}

impl IndexScanner {
    pub fn new(store: Datastore, workers: usize, progress: Arc<dyn Progress>) -> Self {
        Self {
            store,
            workers,
            progress,
        }
    }

    /// Finds all `.fidx` / `.didx` files below the category directories.
    ///
    /// Missing categories are skipped; any other walk error aborts the scan,
    /// since an unvisited subtree could hold the only reference to a chunk.
    pub fn discover(&self, cancel: &CancellationToken) -> GcResult<Vec<IndexFile>> {
        let categories: Vec<PathBuf> = self.store.category_dirs().collect();
        self.progress.begin(Phase::Discover, categories.len() as u64);

        let mut found = Vec::new();
        for dir in categories {
            if cancel.is_cancelled() {
                return Err(GcError::cancelled());
            }
            match std::fs::metadata(&dir) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Category {} does not exist, skipping", dir.display());
                    self.progress.inc(Phase::Discover, 1);
                    continue;
                }
                Err(e) => return Err(GcError::io(ErrorCode::CategoryWalk, &dir, e)),
            }

            for entry in WalkDir::new(&dir) {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_else(|| dir.clone());
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                    GcError::io(ErrorCode::CategoryWalk, &path, source)
                })?;
                if entry.file_type().is_dir() {
                    continue;
                }
                if let Some(kind) = IndexKind::from_path(entry.path()) {
                    found.push(IndexFile {
                        path: entry.into_path(),
                        kind,
                    });
                }
            }
            self.progress.inc(Phase::Discover, 1);
        }
        self.progress.finish(Phase::Discover);

        info!("Found {} index files", found.len());
        Ok(found)
    }

    /// Runs discovery and parsing; the live set is only returned if every
    /// index file was read successfully.
    pub async fn scan(&self, cancel: &CancellationToken) -> GcResult<MarkResult> {
        let discover = {
            let scanner = self.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || scanner.discover(&cancel))
        };
        let mut files = discover
            .await
            .map_err(|e| GcError::with_message(ErrorCode::WorkerFailed, e.to_string()))??;

        // Index sizes correlate with category, not position; shuffling
        // spreads the heavy ones across workers.
        files.shuffle(&mut rand::thread_rng());

        self.parse_all(Arc::new(files), cancel).await
    }

    /// Parses `files` with the configured number of workers.
    pub async fn parse_all(
        &self,
        files: Arc<Vec<IndexFile>>,
        cancel: &CancellationToken,
    ) -> GcResult<MarkResult> {
        let live = Arc::new(Mutex::new(LiveSet::new()));
        let progress = Arc::clone(&self.progress);
        progress.begin(Phase::Metadata, files.len() as u64);

        let shared = Arc::clone(&live);
        let worker_files = Arc::clone(&files);
        let worker_progress = Arc::clone(&progress);
        run_partitioned(files.len(), self.workers, cancel, move |range, cancel| {
            let mut local = LiveSet::new();
            for file in &worker_files[range] {
                if cancel.is_cancelled() {
                    return Err(GcError::cancelled());
                }
                let records = read_index(file, &mut local)?;
                debug!("{}: {} records", file.path.display(), records);
                worker_progress.inc(Phase::Metadata, 1);
            }
            shared.lock().extend(local);
            Ok(())
        })
        .await?;
        progress.finish(Phase::Metadata);

        let live = std::mem::take(&mut *live.lock());
        info!(
            "Collected {} live digests from {} index files",
            live.len(),
            files.len()
        );
        Ok(MarkResult {
            live,
            index_files: files.len(),
        })
    }
}

/// Reads one index file and adds its digests to `live`.
pub fn read_index(file: &IndexFile, live: &mut LiveSet) -> GcResult<usize> {
    let payload =
        std::fs::read(&file.path).map_err(|e| GcError::io(ErrorCode::IndexRead, &file.path, e))?;
    file.kind.collect_digests(&payload, live).map_err(|e| {
        let mut err = GcError::with_message(
            ErrorCode::IndexTruncated,
            format!("{}: {}", file.path.display(), e),
        );
        err.path = Some(file.path.clone());
        err
    })
}
