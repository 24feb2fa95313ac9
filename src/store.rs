//! Append-only content-addressed chunk store.
//!
//! The store file is a bare concatenation of records, each
//! `hash (20 bytes) ‖ length (3 bytes, big-endian) ‖ payload`, readable only
//! by sequential replay from offset 0. Existing bytes are never rewritten or
//! truncated; every mutation is an append of whole records.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::chunker::ChunkedStream;
use crate::error::{Result, VaultError};
use crate::hash::ChunkId;

/// Outcome of one append batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Number of records written.
    pub records: usize,
    /// Payload bytes written (record headers excluded).
    pub bytes: u64,
}

/// In-memory index over an append-only store file.
///
/// Loading replays every record from offset 0 into a map from identity to
/// payload. Appending writes only identities the index has not seen,
/// updating the index as it goes, so duplicates within one batch are also
/// written once.
#[derive(Debug, Default)]
pub struct ChunkStore {
    index: FxHashMap<ChunkId, Vec<u8>>,
    record_limit: Option<u64>,
}

impl ChunkStore {
    /// Load a store file, requiring it to exist.
    ///
    /// This is the decode-side entry point: a decode without its store
    /// cannot succeed, so a missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read, or
    /// [`VaultError::TruncatedStore`] if replay ends mid-record.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Ok(Self {
            index: Self::replay(&mut reader)?,
            record_limit: None,
        })
    }

    /// Load a store file, treating a missing file as an empty store.
    ///
    /// This is the encode-side entry point: encoding against a store that
    /// does not exist yet simply starts fresh.
    ///
    /// # Errors
    ///
    /// As for [`load`](Self::load), except that a not-found open error
    /// yields an empty store.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match File::open(path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                Ok(Self {
                    index: Self::replay(&mut reader)?,
                    record_limit: None,
                })
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Cap the number of distinct identities the store may hold.
    ///
    /// Off by default. When set, an append that would grow the store past
    /// the limit fails with [`VaultError::StoreCapacityExceeded`].
    #[must_use]
    pub fn with_record_limit(mut self, limit: Option<u64>) -> Self {
        self.record_limit = limit;
        self
    }

    /// Whether an identity is present.
    #[must_use]
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.index.contains_key(id)
    }

    /// Payload bytes for an identity, if present.
    #[must_use]
    pub fn get(&self, id: &ChunkId) -> Option<&[u8]> {
        self.index.get(id).map(Vec::as_slice)
    }

    /// Number of distinct identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Append every chunk of `chunks` whose identity is not yet present.
    ///
    /// Records are written in stream-sequence order. The file is opened in
    /// append mode and existing bytes are never touched; one encode run's
    /// append is a single critical section with respect to other writers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written,
    /// [`VaultError::StoreCapacityExceeded`] if a configured record limit
    /// would be passed, or [`VaultError::MissingChunk`] if a sequence
    /// identity has no payload (an internal inconsistency in `chunks`).
    pub fn append(&mut self, path: &Path, chunks: &ChunkedStream) -> Result<AppendOutcome> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        let mut outcome = AppendOutcome::default();

        for id in chunks.sequence() {
            if self.index.contains_key(id) {
                continue;
            }
            if let Some(limit) = self.record_limit {
                if self.index.len() as u64 >= limit {
                    return Err(VaultError::StoreCapacityExceeded { limit });
                }
            }
            let payload = chunks
                .payload(id)
                .ok_or(VaultError::MissingChunk { id: *id })?;
            id.write_to(&mut writer)?;
            writer.write_all(payload)?;
            self.index.insert(*id, payload.to_vec());
            outcome.records += 1;
            outcome.bytes += u64::from(id.length());
        }

        writer.flush()?;
        Ok(outcome)
    }

    /// Replay records sequentially, building the index.
    fn replay<R: Read>(reader: &mut R) -> Result<FxHashMap<ChunkId, Vec<u8>>> {
        let mut index = FxHashMap::default();
        let mut offset: u64 = 0;
        let mut header = [0u8; ChunkId::ENCODED_LEN];

        loop {
            let got = read_full(reader, &mut header)?;
            if got == 0 {
                break;
            }
            if got < header.len() {
                return Err(VaultError::TruncatedStore { offset });
            }
            let id = ChunkId::decode(&header);
            let mut payload = vec![0u8; id.length() as usize];
            reader.read_exact(&mut payload).map_err(|err| {
                if err.kind() == ErrorKind::UnexpectedEof {
                    VaultError::TruncatedStore { offset }
                } else {
                    VaultError::Io(err)
                }
            })?;
            index.insert(id, payload);
            offset += (ChunkId::ENCODED_LEN as u64) + u64::from(id.length());
        }

        Ok(index)
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
