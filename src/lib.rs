//! chunk-gc: mark-and-sweep garbage collector for a content-addressed chunk store.
//!
//! Every `.fidx` / `.didx` index below the `vm`, `ns` and `ct` directories of
//! a datastore is parsed into the set of live digests, while the 65536 shard
//! directories under `.chunks` are listed concurrently. Chunks present on disk
//! but referenced by no index are written to a report and, on request,
//! removed.
//!
//! # Example
//!
//! ```no_run
//! use chunk_gc::{Config, GarbageCollector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = GarbageCollector::new(Config::new("/mnt/datastore"));
//!     let summary = collector.run().await.unwrap();
//!     println!("{} garbage chunks", summary.garbage_found);
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod progress;
pub mod storage;

// Re-exports for convenience
pub use config::{Args, Config, DEFAULT_WORKERS};
pub use error::{ErrorCode, GcError, GcResult};
pub use models::{DeleteStats, Digest, GcSummary, IndexKind};
pub use progress::{LogProgress, NoProgress, Phase, Progress};
pub use storage::{BlobEnumerator, Datastore, Deleter, GarbageCollector, IndexScanner};
