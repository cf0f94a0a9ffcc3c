//! Per-chunk sealing and the on-wire record format
//!
//! Sealed chunk record (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! AAD = empty
//! ```
//!
//! `N` equals the plaintext chunk length: `CHUNK_SIZE` for every record except
//! possibly the last one of a stream.

use rand::{CryptoRng, RngCore};
use tracing::warn;

use chunkseal_core::{ChunksealError, ChunksealResult};

use crate::cipher::GcmCipher;
use crate::{MAX_RECORD_SIZE, NONCE_SIZE, RECORD_OVERHEAD, TAG_SIZE};

/// Draw a fresh nonce. A failing generator is fatal; there is no fallback.
pub fn fresh_nonce<G: RngCore + CryptoRng>(rng: &mut G) -> ChunksealResult<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.try_fill_bytes(&mut nonce)
        .map_err(ChunksealError::RandomnessUnavailable)?;
    Ok(nonce)
}

/// Seal one chunk under a freshly drawn nonce.
///
/// Returns: `[12-byte nonce][ciphertext][16-byte tag]`
pub fn seal_record<G: RngCore + CryptoRng>(
    cipher: &GcmCipher,
    rng: &mut G,
    chunk_index: u64,
    chunk: &[u8],
) -> ChunksealResult<Vec<u8>> {
    let nonce = fresh_nonce(rng)?;
    seal_with_nonce(cipher, chunk_index, &nonce, chunk)
}

/// Seal one chunk under a nonce the caller has already drawn.
pub(crate) fn seal_with_nonce(
    cipher: &GcmCipher,
    chunk_index: u64,
    nonce: &[u8; NONCE_SIZE],
    chunk: &[u8],
) -> ChunksealResult<Vec<u8>> {
    let sealed = cipher
        .seal(nonce, chunk)
        .map_err(|_| ChunksealError::Seal { chunk: chunk_index })?;

    let mut record = Vec::with_capacity(NONCE_SIZE + sealed.len());
    record.extend_from_slice(nonce);
    record.extend_from_slice(&sealed);
    Ok(record)
}

/// Verify and decrypt one record.
///
/// A record too short to hold a nonce and a tag is treated exactly like a tag
/// mismatch: the stream was truncated or tampered with.
pub fn open_record(cipher: &GcmCipher, chunk_index: u64, record: &[u8]) -> ChunksealResult<Vec<u8>> {
    if record.len() < RECORD_OVERHEAD {
        warn!(
            chunk = chunk_index,
            len = record.len(),
            "record shorter than nonce + tag"
        );
        return Err(ChunksealError::AuthenticationFailed { chunk: chunk_index });
    }

    let (nonce_bytes, sealed) = record.split_at(NONCE_SIZE);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);

    cipher.open(&nonce, sealed).map_err(|_| {
        warn!(chunk = chunk_index, "chunk failed authentication");
        ChunksealError::AuthenticationFailed { chunk: chunk_index }
    })
}

/// A record located inside an in-memory stream, not yet authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef<'a> {
    pub index: u64,
    pub nonce: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
}

impl RecordRef<'_> {
    /// Plaintext length this record will decrypt to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Slice `stream` into records with the decoder's fixed-window rule.
pub fn split_records(stream: &[u8]) -> ChunksealResult<Vec<RecordRef<'_>>> {
    stream
        .chunks(MAX_RECORD_SIZE)
        .enumerate()
        .map(|(i, window)| {
            let index = i as u64;
            if window.len() < RECORD_OVERHEAD {
                return Err(ChunksealError::AuthenticationFailed { chunk: index });
            }
            let (nonce, rest) = window.split_at(NONCE_SIZE);
            let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
            Ok(RecordRef {
                index,
                nonce,
                ciphertext,
                tag,
            })
        })
        .collect()
}
