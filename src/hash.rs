//! Chunk identity: cryptographic hash plus length.
//!
//! A chunk is identified by the pair (20-byte SHA-1 digest of its bytes,
//! length in bytes). The pair has a fixed 23-byte binary encoding used both
//! for store records and reference-list entries.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Result, VaultError};

/// Largest chunk length representable in the 3-byte length field.
pub const MAX_CHUNK_LEN: u32 = (1 << 24) - 1;

/// Cryptographic digest of a chunk's bytes.
///
/// # Example
///
/// ```rust
/// use chunkvault::ChunkHash;
///
/// let hash1 = ChunkHash::compute(b"hello world");
/// let hash2 = ChunkHash::compute(b"hello world");
/// assert_eq!(hash1, hash2);
///
/// let hash3 = ChunkHash::compute(b"different data");
/// assert_ne!(hash1, hash3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkHash([u8; Self::LEN]);

impl ChunkHash {
    /// Digest length in bytes.
    pub const LEN: usize = 20;

    /// Compute the digest of `data`.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create a `ChunkHash` from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl std::fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ChunkHash({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl std::fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl AsRef<[u8]> for ChunkHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identity of a chunk: digest plus length.
///
/// Encodes to exactly [`ENCODED_LEN`](Self::ENCODED_LEN) bytes:
///
/// ```text
/// ┌──────────┬──────────────────────┐
/// │   HASH   │        LENGTH        │
/// │ 20 bytes │ 3 bytes, big-endian  │
/// └──────────┴──────────────────────┘
/// ```
///
/// The length participates in identity: two chunks match only if both digest
/// and length agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId {
    hash: ChunkHash,
    length: u32,
}

impl ChunkId {
    /// Encoded size: 20-byte hash plus 3-byte length.
    pub const ENCODED_LEN: usize = ChunkHash::LEN + 3;

    /// Create an identity, enforcing the 3-byte length invariant.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ChunkTooLarge`] if `length` exceeds
    /// [`MAX_CHUNK_LEN`].
    pub fn new(hash: ChunkHash, length: u32) -> Result<Self> {
        if length > MAX_CHUNK_LEN {
            return Err(VaultError::ChunkTooLarge {
                length: u64::from(length),
            });
        }
        Ok(Self { hash, length })
    }

    /// Identity of a payload: digest of its bytes plus its length.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ChunkTooLarge`] if the payload exceeds
    /// [`MAX_CHUNK_LEN`] bytes.
    pub fn of(payload: &[u8]) -> Result<Self> {
        let length = u32::try_from(payload.len()).map_err(|_| VaultError::ChunkTooLarge {
            length: payload.len() as u64,
        })?;
        Self::new(ChunkHash::compute(payload), length)
    }

    /// The digest component.
    #[must_use]
    pub const fn hash(&self) -> &ChunkHash {
        &self.hash
    }

    /// The length component in bytes.
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Encode to the fixed 23-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[..ChunkHash::LEN].copy_from_slice(self.hash.as_bytes());
        let len = self.length.to_be_bytes();
        buf[ChunkHash::LEN..].copy_from_slice(&len[1..]);
        buf
    }

    /// Decode from the fixed 23-byte wire form.
    ///
    /// Infallible: any 3-byte length is within [`MAX_CHUNK_LEN`].
    #[must_use]
    pub fn decode(buf: &[u8; Self::ENCODED_LEN]) -> Self {
        let mut hash = [0u8; ChunkHash::LEN];
        hash.copy_from_slice(&buf[..ChunkHash::LEN]);
        let length = u32::from_be_bytes([0, buf[20], buf[21], buf[22]]);
        Self {
            hash: ChunkHash::from_bytes(hash),
            length,
        }
    }

    /// Read one encoded identity from a reader.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails or the stream ends early.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::ENCODED_LEN];
        reader.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }

    /// Write the encoded identity to a writer.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hash, self.length)
    }
}
