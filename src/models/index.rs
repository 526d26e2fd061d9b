//! Snapshot index file formats.
//!
//! Both formats start with a fixed 4096-byte header followed by fixed-size
//! records. Fixed (`.fidx`) records are the bare 32-byte digest; dynamic
//! (`.didx`) records are 40 bytes with an 8-byte end offset before the digest.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::digest::{Digest, DIGEST_LEN};

/// Size of the header preceding the records of every index file.
pub const INDEX_HEADER_SIZE: usize = 4096;

/// Extension of fixed-size chunk indexes (disk images).
pub const FIXED_INDEX_EXT: &str = "fidx";

/// Extension of dynamic chunk indexes (file archives).
pub const DYNAMIC_INDEX_EXT: &str = "didx";

/// Index file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Metadata index: one digest per 32-byte record.
    Fixed,
    /// Data index: 8-byte offset then digest, 40 bytes per record.
    Dynamic,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Fixed => FIXED_INDEX_EXT,
            IndexKind::Dynamic => DYNAMIC_INDEX_EXT,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            FIXED_INDEX_EXT => Some(IndexKind::Fixed),
            DYNAMIC_INDEX_EXT => Some(IndexKind::Dynamic),
            _ => None,
        }
    }

    /// Detects the kind from a file path; `None` for unrelated files.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Stride between consecutive records.
    pub fn record_size(&self) -> usize {
        match self {
            IndexKind::Fixed => DIGEST_LEN,
            IndexKind::Dynamic => 8 + DIGEST_LEN,
        }
    }

    /// Offset of the digest inside a record.
    pub fn digest_offset(&self) -> usize {
        match self {
            IndexKind::Fixed => 0,
            IndexKind::Dynamic => 8,
        }
    }

    /// Inserts every digest referenced by `payload` into `live`.
    ///
    /// Returns the number of records read. A payload shorter than the header
    /// or ending in a partial record is rejected rather than partially used.
    pub fn collect_digests(
        &self,
        payload: &[u8],
        live: &mut HashSet<Digest>,
    ) -> Result<usize, IndexFormatError> {
        if payload.len() < INDEX_HEADER_SIZE {
            return Err(IndexFormatError::ShortHeader { len: payload.len() });
        }
        let records = &payload[INDEX_HEADER_SIZE..];
        let stride = self.record_size();
        if records.len() % stride != 0 {
            return Err(IndexFormatError::PartialRecord {
                kind: *self,
                trailing: records.len() % stride,
            });
        }

        let offset = self.digest_offset();
        let mut count = 0;
        for record in records.chunks_exact(stride) {
            if let Some(digest) = Digest::from_slice(&record[offset..offset + DIGEST_LEN]) {
                live.insert(digest);
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Structural problems in an index file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexFormatError {
    #[error("file is {len} bytes, shorter than the {}-byte header", INDEX_HEADER_SIZE)]
    ShortHeader { len: usize },
    #[error("{trailing} trailing bytes after the last complete {} record", .kind.as_str())]
    PartialRecord { kind: IndexKind, trailing: usize },
}
