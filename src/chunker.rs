//! Content-defined chunking driven by the rolling fingerprint.
//!
//! The chunker scans an input stream byte by byte, maintains the Rabin
//! fingerprint, and cuts a chunk wherever the masked fingerprint hits the
//! cut constant. Boundaries are determined purely by local content, so an
//! insertion or deletion only perturbs the chunks near the edit.

use std::io::Read;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::fingerprint::{RabinFingerprinter, MAX_DEGREE, MIN_DEGREE};
use crate::hash::{ChunkId, MAX_CHUNK_LEN};
use crate::polynomial::irreducible_polynomial;

/// Default sliding-window width in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 48;

/// Default fingerprint degree in bits.
pub const DEFAULT_FINGERPRINT_DEGREE: u32 = 53;

/// Default boundary mask size in bits (expected chunk size ≈ 8 KiB).
pub const DEFAULT_MASK_SIZE: u32 = 13;

/// The masked fingerprint value that marks a cut point.
pub const CUT_VALUE: u64 = 1;

const DEFAULT_READ_CAPACITY: usize = 64 * 1024;

/// Chunking configuration.
///
/// A given (window size, degree, mask size) triple fully determines chunk
/// boundaries and identities for any byte stream: the modulus polynomial is
/// derived deterministically from the degree, so two processes sharing this
/// configuration agree without exchanging anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Width of the rolling-fingerprint context window in bytes.
    pub window_size: usize,
    /// Size of the irreducible polynomial / fingerprint value in bits
    /// (8-56).
    pub fingerprint_degree: u32,
    /// Number of low fingerprint bits tested at each position. Expected
    /// chunk size is `2^mask_size` bytes; smaller masks mean finer-grained
    /// dedup and more store overhead.
    pub mask_size: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            fingerprint_degree: DEFAULT_FINGERPRINT_DEGREE,
            mask_size: DEFAULT_MASK_SIZE,
        }
    }
}

impl ChunkerConfig {
    /// Create a configuration from explicit values.
    #[must_use]
    pub const fn new(window_size: usize, fingerprint_degree: u32, mask_size: u32) -> Self {
        Self {
            window_size,
            fingerprint_degree,
            mask_size,
        }
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidWindowSize`], [`VaultError::InvalidDegree`],
    /// or [`VaultError::InvalidMaskSize`] when a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(VaultError::InvalidWindowSize(self.window_size));
        }
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&self.fingerprint_degree) {
            return Err(VaultError::InvalidDegree(self.fingerprint_degree));
        }
        if self.mask_size == 0 || self.mask_size > self.fingerprint_degree {
            return Err(VaultError::InvalidMaskSize {
                mask_size: self.mask_size,
                degree: self.fingerprint_degree,
            });
        }
        Ok(())
    }

    /// Expected chunk size in bytes (probabilistic, content-determined).
    #[must_use]
    pub const fn expected_chunk_size(&self) -> u64 {
        1 << self.mask_size
    }

    const fn boundary_mask(&self) -> u64 {
        (1 << self.mask_size) - 1
    }
}

/// One stream's chunking result: the ordered identity sequence plus the
/// payload bytes of each distinct identity.
///
/// The sequence order is semantically significant: it is the only
/// representation of the original byte order. Concatenating the payloads in
/// sequence order reproduces the input exactly.
#[derive(Debug, Clone, Default)]
pub struct ChunkedStream {
    sequence: Vec<ChunkId>,
    payloads: FxHashMap<ChunkId, Vec<u8>>,
}

impl ChunkedStream {
    /// Chunk identities in stream order, one per chunk.
    #[must_use]
    pub fn sequence(&self) -> &[ChunkId] {
        &self.sequence
    }

    /// Payload bytes for an identity produced by this stream.
    #[must_use]
    pub fn payload(&self, id: &ChunkId) -> Option<&[u8]> {
        self.payloads.get(id).map(Vec::as_slice)
    }

    /// Total number of chunks, duplicates included.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.sequence.len()
    }

    /// Number of distinct chunk identities.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.payloads.len()
    }

    /// Total input length in bytes.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.sequence.iter().map(|id| u64::from(id.length())).sum()
    }

    /// Record a finalized chunk, checking the identity against payloads
    /// already seen in this run.
    fn record(&mut self, payload: Vec<u8>) -> Result<()> {
        let id = ChunkId::of(&payload)?;
        self.sequence.push(id);
        match self.payloads.entry(id) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                if existing.get() != &payload {
                    return Err(VaultError::IdentityCollision { id });
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(payload);
            }
        }
        Ok(())
    }
}

/// Content-defined chunker.
///
/// Construction derives a fresh irreducible polynomial from the configured
/// degree and precomputes the fingerprint transition tables; both are reused
/// across [`chunk`](Self::chunk) calls sharing this instance.
///
/// # Example
///
/// ```rust
/// use chunkvault::{Chunker, ChunkerConfig};
///
/// let mut chunker = Chunker::new(ChunkerConfig::default()).unwrap();
/// let stream = chunker.chunk(&b"some input bytes"[..]).unwrap();
///
/// let total: u64 = stream.sequence().iter().map(|id| u64::from(id.length())).sum();
/// assert_eq!(total, 16);
/// ```
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    fingerprinter: RabinFingerprinter,
    mask: u64,
}

impl Chunker {
    /// Create a chunker for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the window size, degree, or mask
    /// size is out of range.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let modulus = irreducible_polynomial(config.fingerprint_degree);
        Ok(Self {
            config,
            fingerprinter: RabinFingerprinter::new(modulus, config.window_size),
            mask: config.boundary_mask(),
        })
    }

    /// The configuration this chunker was built with.
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a byte stream into content-aligned pieces.
    ///
    /// Every byte stream, including the empty stream, produces at least one
    /// chunk: whatever remains at end of stream is finalized even if empty.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails, [`VaultError::ChunkTooLarge`]
    /// if a chunk outgrows the 3-byte length field, or
    /// [`VaultError::IdentityCollision`] if two distinct payloads share an
    /// identity.
    pub fn chunk<R: Read>(&mut self, reader: R) -> Result<ChunkedStream> {
        self.chunk_with_capacity(reader, DEFAULT_READ_CAPACITY)
    }

    /// [`chunk`](Self::chunk) with an explicit read-buffer capacity.
    ///
    /// # Errors
    ///
    /// As for [`chunk`](Self::chunk).
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn chunk_with_capacity<R: Read>(
        &mut self,
        mut reader: R,
        capacity: usize,
    ) -> Result<ChunkedStream> {
        assert!(capacity > 0, "read capacity must be at least 1");

        // Fresh stream traversal: the fingerprint window must not carry
        // state across inputs.
        self.fingerprinter.flush();

        let mut stream = ChunkedStream::default();
        let mut current: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; capacity];

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            for &byte in &buf[..n] {
                let fingerprint = self.fingerprinter.update(byte);
                current.push(byte);
                if current.len() > MAX_CHUNK_LEN as usize {
                    return Err(VaultError::ChunkTooLarge {
                        length: current.len() as u64,
                    });
                }
                if fingerprint & self.mask == CUT_VALUE {
                    stream.record(std::mem::take(&mut current))?;
                }
            }
        }

        // Finalize the trailing partial chunk. The empty stream still yields
        // one (empty) chunk record.
        stream.record(current)?;
        Ok(stream)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rustc_hash::FxHashMap;

    fn chunk_bytes(data: &[u8], config: ChunkerConfig) -> ChunkedStream {
        Chunker::new(config).unwrap().chunk(data).unwrap()
    }

    /// Chunk spans as (id, start, end) byte offsets.
    fn spans(stream: &ChunkedStream) -> Vec<(ChunkId, usize, usize)> {
        let mut out = Vec::with_capacity(stream.total_count());
        let mut offset = 0usize;
        for id in stream.sequence() {
            let len = id.length() as usize;
            out.push((*id, offset, offset + len));
            offset += len;
        }
        out
    }

    fn id_counts(stream: &ChunkedStream) -> FxHashMap<ChunkId, usize> {
        let mut counts = FxHashMap::default();
        for id in stream.sequence() {
            *counts.entry(*id).or_insert(0) += 1;
        }
        counts
    }

    proptest! {
        /// Concatenating payloads in sequence order reproduces the input.
        #[test]
        fn payloads_reproduce_input(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let stream = chunk_bytes(&data, ChunkerConfig::new(8, 16, 5));
            let mut rebuilt = Vec::new();
            for id in stream.sequence() {
                rebuilt.extend_from_slice(stream.payload(id).unwrap());
            }
            prop_assert_eq!(rebuilt, data);
        }

        /// Chunking is deterministic across independent instances.
        #[test]
        fn deterministic(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let config = ChunkerConfig::new(8, 16, 5);
            let first = chunk_bytes(&data, config);
            let second = chunk_bytes(&data, config);
            prop_assert_eq!(first.sequence(), second.sequence());
        }

        /// A localized insertion only perturbs chunks near the edit: every
        /// chunk that ends before the edit, or starts once the window has
        /// passed it, keeps its identity.
        #[test]
        fn insertion_preserves_distant_chunks(
            data in prop::collection::vec(any::<u8>(), 512..2048),
            edit_fraction in 0.0f64..1.0,
            insertion in prop::collection::vec(any::<u8>(), 1..24)
        ) {
            let window = 8usize;
            let config = ChunkerConfig::new(window, 16, 5);
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            let edit_pos = ((data.len() as f64) * edit_fraction) as usize;

            let mut edited = data.clone();
            edited.splice(edit_pos..edit_pos, insertion.iter().copied());

            let base = chunk_bytes(&data, config);
            let changed = chunk_bytes(&edited, config);

            // Chunks overlapping [edit_pos, edit_pos + window) may differ.
            let volatile = spans(&base)
                .iter()
                .filter(|(_, start, end)| *end > edit_pos && *start < edit_pos + window)
                .count();

            let base_counts = id_counts(&base);
            let changed_counts = id_counts(&changed);
            let shared: usize = base_counts
                .iter()
                .map(|(id, n)| (*n).min(changed_counts.get(id).copied().unwrap_or(0)))
                .sum();

            prop_assert!(
                shared >= base.total_count() - volatile,
                "shared {} of {} base chunks, but only {} overlap the edit",
                shared,
                base.total_count(),
                volatile
            );
        }
    }
}
