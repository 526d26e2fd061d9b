//! Garbage collector error types.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classification of everything that can stop a collection run.
///
/// Recoverable conditions (foreign files in a shard, unrelated files next to
/// index files) and per-file deletion failures never become an error; they
/// are handled where they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The run was started without a usable configuration.
    InvalidConfig,
    /// An index file could not be read.
    IndexRead,
    /// An index file is shorter than its header or ends in a partial record.
    IndexTruncated,
    /// A category directory could not be walked.
    CategoryWalk,
    /// A shard directory of the chunk store could not be listed.
    ShardList,
    /// The garbage report could not be written.
    ReportWrite,
    /// A worker stopped because a sibling worker failed.
    Cancelled,
    /// A worker task panicked or was aborted.
    WorkerFailed,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "InvalidConfig",
            ErrorCode::IndexRead => "IndexRead",
            ErrorCode::IndexTruncated => "IndexTruncated",
            ErrorCode::CategoryWalk => "CategoryWalk",
            ErrorCode::ShardList => "ShardList",
            ErrorCode::ReportWrite => "ReportWrite",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::WorkerFailed => "WorkerFailed",
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "The configuration is invalid.",
            ErrorCode::IndexRead => "Failed to read an index file.",
            ErrorCode::IndexTruncated => "An index file is truncated.",
            ErrorCode::CategoryWalk => "Failed to walk a backup category directory.",
            ErrorCode::ShardList => "Failed to list a chunk shard directory.",
            ErrorCode::ReportWrite => "Failed to write the garbage report.",
            ErrorCode::Cancelled => "The phase was cancelled after a sibling worker failed.",
            ErrorCode::WorkerFailed => "A worker task terminated abnormally.",
        }
    }

    /// Whether this error means the live set or blob set is incomplete.
    ///
    /// No deletion decision may be made after such an error.
    pub fn is_fatal_scan(&self) -> bool {
        matches!(
            self,
            ErrorCode::IndexRead
                | ErrorCode::IndexTruncated
                | ErrorCode::CategoryWalk
                | ErrorCode::ShardList
                | ErrorCode::Cancelled
                | ErrorCode::WorkerFailed
        )
    }
}

/// Collector error with code, message and the offending path if any.
#[derive(Debug, Error)]
#[error("{}: {message}", .code.as_str())]
pub struct GcError {
    pub code: ErrorCode,
    pub message: String,
    pub path: Option<PathBuf>,
    #[source]
    pub source: Option<io::Error>,
}

impl GcError {
    /// Creates a new error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            path: None,
            source: None,
        }
    }

    /// Creates a new error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Wraps a filesystem error raised while touching `path`.
    pub fn io(code: ErrorCode, path: &Path, source: io::Error) -> Self {
        Self {
            message: format!("{} ({}: {})", code.default_message(), path.display(), source),
            code,
            path: Some(path.to_path_buf()),
            source: Some(source),
        }
    }

    /// Shorthand for the error returned by workers that observed cancellation.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }
}

/// Result type alias for collector operations.
pub type GcResult<T> = Result<T, GcError>;
