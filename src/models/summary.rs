//! Run statistics.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of the sweep phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteStats {
    /// Files removed by this run.
    pub removed: u64,
    /// Files that were already gone when the sweep reached them.
    pub missing: u64,
    /// Files that could not be removed (permissions, I/O errors).
    pub failed: u64,
    /// The sweep was cancelled before reaching the end of the list.
    pub interrupted: bool,
}

impl DeleteStats {
    pub fn merge(&mut self, other: &DeleteStats) {
        self.removed += other.removed;
        self.missing += other.missing;
        self.failed += other.failed;
        self.interrupted |= other.interrupted;
    }

    pub fn attempted(&self) -> u64 {
        self.removed + self.missing + self.failed
    }
}

/// Summary of a complete collection run.
#[derive(Debug, Clone, Serialize)]
pub struct GcSummary {
    /// Distinct digests referenced by any index.
    pub live_digests: usize,
    /// Index files parsed.
    pub index_files: usize,
    /// Chunk files found in the store.
    pub blobs_found: usize,
    /// Chunk files not referenced by any index.
    pub garbage_found: usize,
    /// Where the garbage list was written.
    pub report_path: PathBuf,
    /// Time spent scanning and writing the report.
    #[serde(with = "duration_secs")]
    pub scan_elapsed: Duration,
    /// Sweep outcome; `None` for a dry run.
    pub deleted: Option<DeleteStats>,
    /// Time spent in the sweep.
    #[serde(with = "duration_secs")]
    pub delete_elapsed: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_delete_stats() {
        let mut total = DeleteStats::default();
        total.merge(&DeleteStats {
            removed: 3,
            missing: 1,
            failed: 0,
            interrupted: false,
        });
        assert!(!total.interrupted);
        total.merge(&DeleteStats {
            removed: 2,
            missing: 0,
            failed: 1,
            interrupted: true,
        });
        assert_eq!(total.removed, 5);
        assert_eq!(total.missing, 1);
        assert_eq!(total.failed, 1);
        assert_eq!(total.attempted(), 7);
        assert!(total.interrupted);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = GcSummary {
            live_digests: 2,
            index_files: 1,
            blobs_found: 3,
            garbage_found: 1,
            report_path: PathBuf::from("delete-2024-01-01 00:00:00.txt"),
            scan_elapsed: Duration::from_millis(1500),
            deleted: None,
            delete_elapsed: Duration::ZERO,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["garbage_found"], 1);
        assert_eq!(json["scan_elapsed"], 1.5);
        assert!(json["deleted"].is_null());
    }
}
