//! Encode/decode engine tying the chunker to the store.
//!
//! Encoding chunks an input stream, writes its ordered reference list, and
//! extends the shared store with previously-unseen chunks. Decoding reads a
//! reference list plus the store and reconstructs the original bytes
//! exactly. Reconstruction is all-or-nothing: every reference is resolved
//! before the output file is created.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::{
    Chunker, ChunkerConfig, DEFAULT_FINGERPRINT_DEGREE, DEFAULT_MASK_SIZE, DEFAULT_WINDOW_SIZE,
};
use crate::error::{Result, VaultError};
use crate::hash::ChunkId;
use crate::store::ChunkStore;

/// Configuration for encode operations.
///
/// Decoding needs none of this: chunk boundaries are implicit in the
/// reference list and store, never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Width of the rolling-fingerprint context window in bytes.
    pub window_size: usize,
    /// Fingerprint degree in bits (8-56).
    pub fingerprint_degree: u32,
    /// Boundary mask size in bits; expected chunk size is `2^mask_size`.
    pub mask_size: u32,
    /// Read-buffer capacity for input streaming.
    pub buffer_size: usize,
    /// Optional cap on the store's distinct-identity count. Off by default;
    /// the 3-byte length invariant is enforced unconditionally regardless.
    pub record_limit: Option<u64>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            fingerprint_degree: DEFAULT_FINGERPRINT_DEGREE,
            mask_size: DEFAULT_MASK_SIZE,
            buffer_size: 64 * 1024,
            record_limit: None,
        }
    }
}

impl VaultConfig {
    fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.window_size, self.fingerprint_degree, self.mask_size)
    }
}

/// Builder for creating vaults with custom configuration.
///
/// # Example
///
/// ```rust
/// use chunkvault::VaultBuilder;
///
/// let vault = VaultBuilder::new()
///     .window_size(16)
///     .mask_size(10)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct VaultBuilder {
    config: VaultConfig,
}

impl VaultBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rolling-window width in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn window_size(mut self, size: usize) -> Self {
        assert!(size > 0, "window size must be at least 1");
        self.config.window_size = size;
        self
    }

    /// Set the fingerprint degree in bits.
    ///
    /// # Panics
    ///
    /// Panics if `degree` is outside 8..=56.
    #[must_use]
    pub fn fingerprint_degree(mut self, degree: u32) -> Self {
        assert!((8..=56).contains(&degree), "degree must be 8-56");
        self.config.fingerprint_degree = degree;
        self
    }

    /// Set the boundary mask size in bits.
    ///
    /// # Panics
    ///
    /// Panics if `mask_size` is zero or exceeds 56.
    #[must_use]
    pub fn mask_size(mut self, mask_size: u32) -> Self {
        assert!(
            (1..=56).contains(&mask_size),
            "mask size must be 1-56"
        );
        self.config.mask_size = mask_size;
        self
    }

    /// Set the read-buffer capacity.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Cap the store's distinct-identity count.
    #[must_use]
    pub fn record_limit(mut self, limit: Option<u64>) -> Self {
        self.config.record_limit = limit;
        self
    }

    /// Build the vault.
    #[must_use]
    pub fn build(self) -> Vault {
        Vault {
            config: self.config,
        }
    }
}

/// Statistics from one encode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeStats {
    /// Chunks in the input stream, duplicates included.
    pub total_chunks: usize,
    /// Distinct chunk identities in the input stream.
    pub unique_chunks: usize,
    /// Records appended to the store by this operation.
    pub new_records: usize,
    /// Payload bytes appended to the store by this operation.
    pub new_bytes: u64,
    /// Input length in bytes.
    pub input_len: u64,
    /// Distinct identities in the store after this operation.
    pub store_records: usize,
}

impl EncodeStats {
    /// Fraction of input bytes that were already present in the store or
    /// repeated within the input (0.0 for a store gaining everything,
    /// 1.0 for a fully deduplicated input).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dedup_ratio(&self) -> f64 {
        if self.input_len == 0 {
            return 0.0;
        }
        1.0 - (self.new_bytes as f64 / self.input_len as f64)
    }
}

/// Statistics from one decode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Reference-list entries resolved.
    pub chunk_count: usize,
    /// Bytes written to the output.
    pub output_len: u64,
}

/// Content-defined dedup engine.
///
/// One vault value carries the chunking configuration; the store and
/// reference-list files are named per operation, so a single vault can serve
/// many files against many stores.
///
/// # Example
///
/// ```rust
/// use chunkvault::Vault;
/// use std::io::Cursor;
///
/// let dir = tempfile::tempdir().unwrap();
/// let refs = dir.path().join("report.cvr");
/// let store = dir.path().join("chunks.store");
/// let restored = dir.path().join("report.out");
///
/// let vault = Vault::new();
/// let stats = vault
///     .encode(Cursor::new(&b"the quick brown fox"[..]), &refs, &store)
///     .unwrap();
/// assert_eq!(stats.input_len, 19);
///
/// vault.decode(&refs, &store, &restored).unwrap();
/// assert_eq!(std::fs::read(&restored).unwrap(), b"the quick brown fox");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    /// Create a vault with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vault with the given configuration.
    ///
    /// Invalid values are reported as errors by the encode operation rather
    /// than panicking here.
    #[must_use]
    pub const fn with_config(config: VaultConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Encode `input` into a reference list at `ref_list_path`, extending
    /// the store at `store_path` with previously-unseen chunks.
    ///
    /// The input is chunked in full before either output file is touched, so
    /// a failure to read the input leaves no partial reference list behind.
    /// The reference list is created or overwritten; the store only grows.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, I/O errors, and the fatal chunking
    /// errors ([`VaultError::ChunkTooLarge`],
    /// [`VaultError::IdentityCollision`],
    /// [`VaultError::StoreCapacityExceeded`]).
    pub fn encode<R: Read>(
        &self,
        input: R,
        ref_list_path: &Path,
        store_path: &Path,
    ) -> Result<EncodeStats> {
        let mut store =
            ChunkStore::load_or_empty(store_path)?.with_record_limit(self.config.record_limit);

        let mut chunker = Chunker::new(self.config.chunker_config())?;
        let chunks = chunker.chunk_with_capacity(input, self.config.buffer_size)?;

        let ref_file = File::create(ref_list_path)?;
        let mut writer = BufWriter::new(ref_file);
        for id in chunks.sequence() {
            id.write_to(&mut writer)?;
        }
        writer.flush()?;

        let outcome = store.append(store_path, &chunks)?;

        Ok(EncodeStats {
            total_chunks: chunks.total_count(),
            unique_chunks: chunks.unique_count(),
            new_records: outcome.records,
            new_bytes: outcome.bytes,
            input_len: chunks.total_len(),
            store_records: store.len(),
        })
    }

    /// Encode the file at `input_path`.
    ///
    /// # Errors
    ///
    /// As for [`encode`](Self::encode).
    pub fn encode_file(
        &self,
        input_path: &Path,
        ref_list_path: &Path,
        store_path: &Path,
    ) -> Result<EncodeStats> {
        let input = File::open(input_path)?;
        self.encode(BufReader::new(input), ref_list_path, store_path)
    }

    /// Reconstruct the original bytes from a reference list and its store.
    ///
    /// The store is loaded in full and every reference is resolved before
    /// the output file is created; a mismatch between list and store fails
    /// with no partial output. Chunking configuration is not consulted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any file cannot be read or written (a missing
    /// store is an error here), [`VaultError::TruncatedRefList`] if the
    /// reference file size is not a multiple of the entry size, or
    /// [`VaultError::MissingChunk`] for a reference absent from the store.
    pub fn decode(
        &self,
        ref_list_path: &Path,
        store_path: &Path,
        output_path: &Path,
    ) -> Result<DecodeStats> {
        let store = ChunkStore::load(store_path)?;

        let data = fs::read(ref_list_path)?;
        if data.len() % ChunkId::ENCODED_LEN != 0 {
            return Err(VaultError::TruncatedRefList {
                length: data.len() as u64,
            });
        }

        let mut sequence = Vec::with_capacity(data.len() / ChunkId::ENCODED_LEN);
        for entry in data.chunks_exact(ChunkId::ENCODED_LEN) {
            let entry: &[u8; ChunkId::ENCODED_LEN] =
                entry.try_into().map_err(|_| VaultError::TruncatedRefList {
                    length: data.len() as u64,
                })?;
            sequence.push(ChunkId::decode(entry));
        }

        // All-or-nothing: resolve every reference before creating output.
        for id in &sequence {
            if !store.contains(id) {
                return Err(VaultError::MissingChunk { id: *id });
            }
        }

        let out_file = File::create(output_path)?;
        let mut writer = BufWriter::new(out_file);
        let mut output_len: u64 = 0;
        for id in &sequence {
            let payload = store
                .get(id)
                .ok_or(VaultError::MissingChunk { id: *id })?;
            writer.write_all(payload)?;
            output_len += u64::from(id.length());
        }
        writer.flush()?;

        Ok(DecodeStats {
            chunk_count: sequence.len(),
            output_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = VaultConfig::default();
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.fingerprint_degree, DEFAULT_FINGERPRINT_DEGREE);
        assert_eq!(config.mask_size, DEFAULT_MASK_SIZE);
        assert_eq!(config.record_limit, None);
    }

    #[test]
    fn builder_sets_fields() {
        let vault = VaultBuilder::new()
            .window_size(16)
            .fingerprint_degree(32)
            .mask_size(10)
            .buffer_size(8192)
            .record_limit(Some(1000))
            .build();
        let config = vault.config();
        assert_eq!(config.window_size, 16);
        assert_eq!(config.fingerprint_degree, 32);
        assert_eq!(config.mask_size, 10);
        assert_eq!(config.buffer_size, 8192);
        assert_eq!(config.record_limit, Some(1000));
    }

    #[test]
    #[should_panic(expected = "window size")]
    fn builder_rejects_zero_window() {
        let _ = VaultBuilder::new().window_size(0);
    }

    #[test]
    #[should_panic(expected = "degree must be")]
    fn builder_rejects_bad_degree() {
        let _ = VaultBuilder::new().fingerprint_degree(60);
    }

    #[test]
    fn invalid_config_surfaces_as_error() {
        let config = VaultConfig {
            mask_size: 60,
            ..VaultConfig::default()
        };
        let vault = Vault::with_config(config);
        let dir = tempfile::tempdir().unwrap();
        let err = vault
            .encode(
                std::io::Cursor::new(b"data"),
                &dir.path().join("refs"),
                &dir.path().join("store"),
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidMaskSize { .. }));
    }

    #[test]
    fn dedup_ratio_empty_input() {
        let stats = EncodeStats {
            total_chunks: 1,
            unique_chunks: 1,
            new_records: 1,
            new_bytes: 0,
            input_len: 0,
            store_records: 1,
        };
        assert!((stats.dedup_ratio() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dedup_ratio_full_dedup() {
        let stats = EncodeStats {
            total_chunks: 4,
            unique_chunks: 2,
            new_records: 0,
            new_bytes: 0,
            input_len: 1000,
            store_records: 2,
        };
        assert!((stats.dedup_ratio() - 1.0).abs() < f64::EPSILON);
    }
}
