//! On-disk layout of a datastore.

use std::path::{Path, PathBuf};

use crate::models::Digest;

/// Backup category directories scanned for index files.
pub const CATEGORY_DIRS: [&str; 3] = ["vm", "ns", "ct"];

/// Name of the chunk store directory inside the datastore root.
pub const CHUNK_DIR: &str = ".chunks";

/// Number of shard directories in the chunk store (`0000`..=`ffff`).
pub const SHARD_COUNT: usize = 1 << 16;

/// Paths of a datastore rooted at `base_dir`.
#[derive(Debug, Clone)]
pub struct Datastore {
    base_dir: PathBuf,
    chunk_dir: PathBuf,
}

impl Datastore {
    /// Relative roots are resolved against the current directory so every
    /// path handed out is absolute.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = std::path::absolute(&base_dir).unwrap_or(base_dir);
        let chunk_dir = base_dir.join(CHUNK_DIR);
        Self {
            base_dir,
            chunk_dir,
        }
    }

    pub fn chunk_dir(&self) -> &Path {
        &self.chunk_dir
    }

    /// Category directories, whether or not they exist.
    pub fn category_dirs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        CATEGORY_DIRS.iter().map(|dir| self.base_dir.join(dir))
    }

    /// Directory of shard `index` (`.chunks/0a1f`).
    pub fn shard_dir(&self, index: usize) -> PathBuf {
        self.chunk_dir.join(shard_name(index))
    }

    /// File holding the chunk `digest` (`.chunks/<prefix>/<hex>`).
    pub fn chunk_path(&self, digest: &Digest) -> PathBuf {
        self.chunk_dir
            .join(digest.shard_prefix())
            .join(digest.to_hex())
    }
}

/// Zero-padded four-digit lowercase hex name of a shard.
pub fn shard_name(index: usize) -> String {
    format!("{:04x}", index)
}
