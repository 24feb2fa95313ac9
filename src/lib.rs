//! # Chunkvault
//!
//! Content-defined chunking and chunk-level deduplication.
//!
//! Chunkvault splits an arbitrary byte stream into variable-length,
//! content-aligned chunks using a Rabin polynomial rolling fingerprint,
//! identifies chunks by a cryptographic hash, and persists unique chunks
//! once in a shared content-addressed store. Any given file is then
//! represented as an ordered list of 23-byte references into that store.
//!
//! ## Features
//!
//! - **Rolling Fingerprint**: GF(2) polynomial remainder over a sliding
//!   window, updated in O(1) per byte via precomputed transition tables
//! - **Deterministic Configuration**: the modulus polynomial is derived
//!   from the fingerprint degree alone, so independent processes agree on
//!   chunk boundaries with no key exchange
//! - **Content-Addressed Store**: append-only record file deduplicating
//!   identical payloads across files and runs
//! - **Exact Reconstruction**: decoding is all-or-nothing and byte-identical
//!
//! ## Example
//!
//! ```rust
//! use chunkvault::Vault;
//! use std::io::Cursor;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let refs = dir.path().join("notes.cvr");
//! let store = dir.path().join("chunks.store");
//! let restored = dir.path().join("notes.out");
//!
//! let vault = Vault::new();
//!
//! // Encode: chunk the input, write the reference list, grow the store.
//! let stats = vault
//!     .encode(Cursor::new(&b"meeting notes, draft two"[..]), &refs, &store)
//!     .unwrap();
//! assert_eq!(stats.input_len, 24);
//!
//! // Decode: resolve the references back into the original bytes.
//! vault.decode(&refs, &store, &restored).unwrap();
//! assert_eq!(std::fs::read(&restored).unwrap(), b"meeting notes, draft two");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

mod chunker;
mod error;
mod fingerprint;
mod hash;
pub mod polynomial;
mod store;
mod vault;

pub use chunker::{
    ChunkedStream, Chunker, ChunkerConfig, CUT_VALUE, DEFAULT_FINGERPRINT_DEGREE,
    DEFAULT_MASK_SIZE, DEFAULT_WINDOW_SIZE,
};
pub use error::{Result, VaultError};
pub use fingerprint::{RabinFingerprinter, MAX_DEGREE, MIN_DEGREE};
pub use hash::{ChunkHash, ChunkId, MAX_CHUNK_LEN};
pub use polynomial::irreducible_polynomial;
pub use store::{AppendOutcome, ChunkStore};
pub use vault::{DecodeStats, EncodeStats, Vault, VaultBuilder, VaultConfig};
