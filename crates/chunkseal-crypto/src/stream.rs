//! Sequential stream encoder and decoder
//!
//! Both directions pull fixed-size windows from a blocking [`Read`] source,
//! accumulating partial reads until the window is full or the source reports
//! end-of-stream. A short window therefore only ever occurs at the very end,
//! which is what lets the decoder find record boundaries without a length
//! prefix.

use std::io::{self, Read, Write};

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};
use zeroize::Zeroizing;

use chunkseal_core::{ChunksealError, ChunksealResult};

use crate::cipher::GcmCipher;
use crate::keys::ChunkKey;
use crate::record::{open_record, seal_record};
use crate::{CHUNK_SIZE, MAX_RECORD_SIZE};

/// Totals for one encode or decode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: u64,
    pub plaintext_bytes: u64,
    pub ciphertext_bytes: u64,
}

impl StreamStats {
    pub(crate) fn record(&mut self, plaintext_len: usize, record_len: usize) {
        self.chunks += 1;
        self.plaintext_bytes += plaintext_len as u64;
        self.ciphertext_bytes += record_len as u64;
    }
}

/// Encrypt everything `source` yields under `key`.
///
/// Empty input produces empty output. The key is validated before the source
/// is touched.
pub fn encode<R: Read>(source: R, key: &[u8]) -> ChunksealResult<Vec<u8>> {
    Encoder::new(key)?.encode(source)
}

/// Decrypt a stream produced by [`encode`]. Any forged, corrupted or truncated
/// record fails the whole call.
pub fn decode<R: Read>(source: R, key: &[u8]) -> ChunksealResult<Vec<u8>> {
    Decoder::new(key)?.decode(source)
}

/// Read into `buf` until it is full or the source is exhausted.
pub(crate) fn fill_window<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[derive(Debug, Clone)]
pub struct Encoder {
    cipher: GcmCipher,
}

impl Encoder {
    pub fn new(key: &[u8]) -> ChunksealResult<Self> {
        Self::with_key(&ChunkKey::from_slice(key)?)
    }

    pub fn with_key(key: &ChunkKey) -> ChunksealResult<Self> {
        Ok(Self {
            cipher: GcmCipher::new(key)?,
        })
    }

    pub(crate) fn cipher(&self) -> &GcmCipher {
        &self.cipher
    }

    /// Drain `source` and return the complete ciphertext stream.
    pub fn encode<R: Read>(&self, source: R) -> ChunksealResult<Vec<u8>> {
        self.encode_with_rng(source, &mut OsRng)
    }

    /// Like [`Encoder::encode`], drawing nonces from `rng`.
    pub fn encode_with_rng<R, G>(&self, source: R, rng: &mut G) -> ChunksealResult<Vec<u8>>
    where
        R: Read,
        G: RngCore + CryptoRng,
    {
        let mut out = Vec::new();
        self.encode_to_with_rng(source, &mut out, rng)?;
        Ok(out)
    }

    /// Stream records into `sink` as they are sealed.
    ///
    /// On error `sink` may already hold a prefix of the stream; discard it.
    pub fn encode_to<R: Read, W: Write>(&self, source: R, sink: W) -> ChunksealResult<StreamStats> {
        self.encode_to_with_rng(source, sink, &mut OsRng)
    }

    pub fn encode_to_with_rng<R, W, G>(
        &self,
        mut source: R,
        mut sink: W,
        rng: &mut G,
    ) -> ChunksealResult<StreamStats>
    where
        R: Read,
        W: Write,
        G: RngCore + CryptoRng,
    {
        let mut buf = Zeroizing::new(vec![0u8; CHUNK_SIZE]);
        let mut stats = StreamStats::default();

        loop {
            let n = fill_window(&mut source, &mut buf).map_err(ChunksealError::SourceRead)?;
            if n == 0 {
                break;
            }

            let record = seal_record(&self.cipher, rng, stats.chunks, &buf[..n])?;
            sink.write_all(&record).map_err(ChunksealError::SinkWrite)?;
            debug!(chunk = stats.chunks, len = n, "sealed chunk");
            stats.record(n, record.len());
        }

        sink.flush().map_err(ChunksealError::SinkWrite)?;
        info!(
            cipher = self.cipher.name(),
            chunks = stats.chunks,
            plaintext_bytes = stats.plaintext_bytes,
            ciphertext_bytes = stats.ciphertext_bytes,
            "encoded stream"
        );
        Ok(stats)
    }
}

#[derive(Debug, Clone)]
pub struct Decoder {
    cipher: GcmCipher,
}

impl Decoder {
    pub fn new(key: &[u8]) -> ChunksealResult<Self> {
        Self::with_key(&ChunkKey::from_slice(key)?)
    }

    pub fn with_key(key: &ChunkKey) -> ChunksealResult<Self> {
        Ok(Self {
            cipher: GcmCipher::new(key)?,
        })
    }

    pub(crate) fn cipher(&self) -> &GcmCipher {
        &self.cipher
    }

    /// Drain `source` and return the full plaintext, or nothing at all.
    pub fn decode<R: Read>(&self, source: R) -> ChunksealResult<Vec<u8>> {
        let mut out = Vec::new();
        self.decode_to(source, &mut out)?;
        Ok(out)
    }

    /// Write each chunk to `sink` once it has authenticated.
    ///
    /// On error `sink` may hold the plaintext of earlier, authentic chunks; the
    /// stream as a whole must still be treated as rejected.
    pub fn decode_to<R: Read, W: Write>(&self, mut source: R, mut sink: W) -> ChunksealResult<StreamStats> {
        let mut buf = vec![0u8; MAX_RECORD_SIZE];
        let mut stats = StreamStats::default();

        loop {
            let n = fill_window(&mut source, &mut buf).map_err(ChunksealError::SourceRead)?;
            if n == 0 {
                break;
            }

            let plaintext = Zeroizing::new(open_record(&self.cipher, stats.chunks, &buf[..n])?);
            sink.write_all(&plaintext).map_err(ChunksealError::SinkWrite)?;
            debug!(chunk = stats.chunks, len = plaintext.len(), "opened chunk");
            stats.record(plaintext.len(), n);
        }

        sink.flush().map_err(ChunksealError::SinkWrite)?;
        info!(
            cipher = self.cipher.name(),
            chunks = stats.chunks,
            plaintext_bytes = stats.plaintext_bytes,
            ciphertext_bytes = stats.ciphertext_bytes,
            "decoded stream"
        );
        Ok(stats)
    }
}
