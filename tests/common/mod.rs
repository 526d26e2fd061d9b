//! Common test utilities.

#![allow(dead_code)]

use rand::{Rng, RngCore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use chunk_gc::models::{DIGEST_LEN, INDEX_HEADER_SIZE};
use chunk_gc::storage::SHARD_COUNT;
use chunk_gc::{Config, Datastore, Digest};

/// Temporary datastore with a complete shard layout.
pub struct TestStore {
    pub dir: TempDir,
    pub reports: TempDir,
    pub store: Datastore,
}

impl TestStore {
    /// Creates the datastore root and all 65536 shard directories.
    pub fn new() -> Self {
        let store = Self::without_shards();
        for shard in 0..SHARD_COUNT {
            fs::create_dir_all(store.store.shard_dir(shard)).unwrap();
        }
        store
    }

    /// Creates only the datastore root.
    pub fn without_shards() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        let store = Datastore::new(dir.path());
        Self {
            dir,
            reports,
            store,
        }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    /// Dry-run configuration writing reports into a private directory.
    pub fn config(&self) -> Config {
        Config::new(self.base()).with_report_dir(self.reports.path())
    }

    /// Writes a chunk file for `digest` and returns its path.
    pub fn add_chunk(&self, digest: &Digest) -> PathBuf {
        let path = self.store.chunk_path(digest);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, digest.as_bytes()).unwrap();
        path
    }

    /// Writes a fixed index (`.fidx`) at `rel` below the datastore root.
    pub fn write_fidx(&self, rel: &str, digests: &[Digest]) -> PathBuf {
        let mut payload = index_header();
        for digest in digests {
            payload.extend_from_slice(digest.as_bytes());
        }
        self.write_file(rel, &payload)
    }

    /// Writes a dynamic index (`.didx`) at `rel` below the datastore root.
    pub fn write_didx(&self, rel: &str, digests: &[Digest]) -> PathBuf {
        let mut payload = index_header();
        let mut end = 0u64;
        for digest in digests {
            end += 4 * 1024 * 1024;
            payload.extend_from_slice(&end.to_le_bytes());
            payload.extend_from_slice(digest.as_bytes());
        }
        self.write_file(rel, &payload)
    }

    pub fn write_file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.base().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Report files written so far.
    pub fn report_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.reports.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

/// Header filled with non-zero bytes so it can never be mistaken for records.
fn index_header() -> Vec<u8> {
    vec![0xa5; INDEX_HEADER_SIZE]
}

pub fn random_digest(rng: &mut impl RngCore) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    rng.fill_bytes(&mut bytes);
    Digest::new(bytes)
}

/// Random digest stored in shard `shard`.
pub fn digest_in_shard(rng: &mut impl Rng, shard: u16) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    rng.fill_bytes(&mut bytes);
    bytes[..2].copy_from_slice(&shard.to_be_bytes());
    Digest::new(bytes)
}

/// Digest with every byte set to `n`; readable in assertion failures.
pub fn digest(n: u8) -> Digest {
    Digest::new([n; DIGEST_LEN])
}
