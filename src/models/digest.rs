//! Content digest of a stored chunk.

use std::fmt;

/// Size of a chunk digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of the hex-encoded digest used as a chunk file name.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// Fixed 32-byte content identifier.
///
/// Equality, ordering and hashing are over the raw bytes, so the type can be
/// used directly as a set key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a digest out of an exactly 32-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; DIGEST_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Decodes a chunk file name.
    ///
    /// Only the canonical form is accepted: exactly 64 lowercase hex
    /// characters. Anything else is not a chunk written by the store.
    pub fn from_hex(name: &str) -> Option<Self> {
        if name.len() != DIGEST_HEX_LEN
            || !name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(name, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Lowercase hex encoding, the chunk's file name.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Name of the shard directory holding this chunk (first two bytes, hex).
    pub fn shard_prefix(&self) -> String {
        format!("{:02x}{:02x}", self.0[0], self.0[1])
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}
