use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 digest of a blob, stored in the database as 64 lowercase hex chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Directory shard and file name: `ab` / `cdef...`.
    pub(crate) fn shard(&self) -> (String, String) {
        (hex::encode(&self.0[..1]), hex::encode(&self.0[1..]))
    }
}

impl FromStr for ContentHash {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| StorageError::InvalidHash(e.to_string()))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidHash(format!("expected 64 hex characters: {s}")))?;
        Ok(Self(digest))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
