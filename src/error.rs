//! Error types for chunkvault operations.

use thiserror::Error;

use crate::hash::ChunkId;

/// Errors that can occur during chunking, encoding, and decoding.
#[derive(Error, Debug)]
pub enum VaultError {
    /// I/O error during read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid window size specified.
    #[error("Invalid window size: {0} (must be at least 1)")]
    InvalidWindowSize(usize),

    /// Invalid fingerprint degree specified.
    #[error("Invalid fingerprint degree: {0} (must be 8-56)")]
    InvalidDegree(u32),

    /// Invalid boundary mask size specified.
    #[error("Invalid mask size: {mask_size} (must be 1-{degree} for degree {degree})")]
    InvalidMaskSize {
        /// Requested mask size in bits.
        mask_size: u32,
        /// Configured fingerprint degree in bits.
        degree: u32,
    },

    /// Two chunks share an identity but have different bytes.
    ///
    /// Signals either a hash-function break or a logic error. Never
    /// resolved silently.
    #[error("Chunk identity collision: two distinct payloads share identity {id}")]
    IdentityCollision {
        /// The colliding identity.
        id: ChunkId,
    },

    /// A chunk's length cannot be represented in the 3-byte length field.
    #[error("Chunk too large: {length} bytes exceeds the 3-byte length limit ({max})", max = crate::hash::MAX_CHUNK_LEN)]
    ChunkTooLarge {
        /// Length of the oversized chunk in bytes.
        length: u64,
    },

    /// The store's distinct-identity count would exceed the configured limit.
    #[error("Store capacity exceeded: record limit is {limit}")]
    StoreCapacityExceeded {
        /// Configured record limit.
        limit: u64,
    },

    /// A reference-list entry has no corresponding store record.
    #[error("Missing chunk: identity {id} referenced but not present in store")]
    MissingChunk {
        /// The unresolvable identity.
        id: ChunkId,
    },

    /// The store file ended in the middle of a record.
    #[error("Truncated store: record starting at offset {offset} is cut short")]
    TruncatedStore {
        /// Byte offset of the incomplete record.
        offset: u64,
    },

    /// The reference-list file size is not a multiple of the entry size.
    #[error("Truncated reference list: {length} bytes is not a multiple of {entry}", entry = ChunkId::ENCODED_LEN)]
    TruncatedRefList {
        /// Total reference-list size in bytes.
        length: u64,
    },
}

/// Result type for chunkvault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
