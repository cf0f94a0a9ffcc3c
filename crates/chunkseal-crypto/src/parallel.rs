//! Batched parallel sealing/opening on the rayon pool
//!
//! Windows are still read sequentially and nonces drawn in chunk order; only
//! the AEAD work of a batch runs in parallel. Results are written in chunk
//! index order, so the output is byte-compatible with the sequential codec.

use std::io::{Read, Write};

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, info};
use zeroize::Zeroizing;

use chunkseal_core::{ChunksealError, ChunksealResult};

use crate::record::{fresh_nonce, open_record, seal_with_nonce};
use crate::stream::{fill_window, Decoder, Encoder, StreamStats};
use crate::{CHUNK_SIZE, MAX_RECORD_SIZE};

/// Resolve a configured batch size, where 0 means one chunk per rayon thread.
pub fn effective_batch_size(batch_size: usize) -> usize {
    if batch_size == 0 {
        rayon::current_num_threads().max(1)
    } else {
        batch_size
    }
}

/// Read up to `batch_size` full windows of `window` bytes.
///
/// Returns the batch and whether the source reported end-of-stream.
fn read_batch<R: Read>(
    source: &mut R,
    window: usize,
    batch_size: usize,
) -> ChunksealResult<(Vec<Zeroizing<Vec<u8>>>, bool)> {
    // batch_size is caller-controlled; grow past a few windows per thread only as data arrives
    let mut batch = Vec::with_capacity(batch_size.min(rayon::current_num_threads().max(1) * 4));
    while batch.len() < batch_size {
        let mut buf = Zeroizing::new(vec![0u8; window]);
        let n = fill_window(source, &mut buf).map_err(ChunksealError::SourceRead)?;
        if n == 0 {
            return Ok((batch, true));
        }
        buf.truncate(n);
        batch.push(buf);
        if n < window {
            return Ok((batch, true));
        }
    }
    Ok((batch, false))
}

impl Encoder {
    pub fn encode_parallel<R: Read>(&self, source: R, batch_size: usize) -> ChunksealResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_parallel_to_with_rng(source, &mut out, &mut OsRng, batch_size)?;
        Ok(out)
    }

    pub fn encode_parallel_to<R: Read, W: Write>(
        &self,
        source: R,
        sink: W,
        batch_size: usize,
    ) -> ChunksealResult<StreamStats> {
        self.encode_parallel_to_with_rng(source, sink, &mut OsRng, batch_size)
    }

    pub fn encode_parallel_to_with_rng<R, W, G>(
        &self,
        mut source: R,
        mut sink: W,
        rng: &mut G,
        batch_size: usize,
    ) -> ChunksealResult<StreamStats>
    where
        R: Read,
        W: Write,
        G: RngCore + CryptoRng,
    {
        let batch_size = effective_batch_size(batch_size);
        let cipher = self.cipher();
        let mut stats = StreamStats::default();

        loop {
            let (batch, eof) = read_batch(&mut source, CHUNK_SIZE, batch_size)?;
            if batch.is_empty() {
                break;
            }

            let nonces = batch
                .iter()
                .map(|_| fresh_nonce(rng))
                .collect::<ChunksealResult<Vec<_>>>()?;
            let first = stats.chunks;

            let records: Vec<ChunksealResult<Vec<u8>>> = batch
                .par_iter()
                .zip(nonces.par_iter())
                .enumerate()
                .map(|(i, (chunk, nonce))| seal_with_nonce(cipher, first + i as u64, nonce, chunk))
                .collect();

            for (record, chunk) in records.into_iter().zip(&batch) {
                let record = record?;
                sink.write_all(&record).map_err(ChunksealError::SinkWrite)?;
                stats.record(chunk.len(), record.len());
            }
            debug!(first_chunk = first, batch = batch.len(), "sealed batch");

            if eof {
                break;
            }
        }

        sink.flush().map_err(ChunksealError::SinkWrite)?;
        info!(
            cipher = cipher.name(),
            chunks = stats.chunks,
            plaintext_bytes = stats.plaintext_bytes,
            ciphertext_bytes = stats.ciphertext_bytes,
            batch_size,
            "encoded stream (parallel)"
        );
        Ok(stats)
    }
}

impl Decoder {
    pub fn decode_parallel<R: Read>(&self, source: R, batch_size: usize) -> ChunksealResult<Vec<u8>> {
        let mut out = Vec::new();
        self.decode_parallel_to(source, &mut out, batch_size)?;
        Ok(out)
    }

    /// Parallel counterpart of [`Decoder::decode_to`]. A batch is written only
    /// after every record in it has authenticated.
    pub fn decode_parallel_to<R: Read, W: Write>(
        &self,
        mut source: R,
        mut sink: W,
        batch_size: usize,
    ) -> ChunksealResult<StreamStats> {
        let batch_size = effective_batch_size(batch_size);
        let cipher = self.cipher();
        let mut stats = StreamStats::default();

        loop {
            let (batch, eof) = read_batch(&mut source, MAX_RECORD_SIZE, batch_size)?;
            if batch.is_empty() {
                break;
            }

            let first = stats.chunks;
            let opened: Vec<ChunksealResult<Zeroizing<Vec<u8>>>> = batch
                .par_iter()
                .enumerate()
                .map(|(i, record)| open_record(cipher, first + i as u64, record).map(Zeroizing::new))
                .collect();
            // lowest failing index wins, matching the sequential decoder
            let opened = opened.into_iter().collect::<ChunksealResult<Vec<_>>>()?;

            for (plaintext, record) in opened.iter().zip(&batch) {
                sink.write_all(plaintext).map_err(ChunksealError::SinkWrite)?;
                stats.record(plaintext.len(), record.len());
            }
            debug!(first_chunk = first, batch = batch.len(), "opened batch");

            if eof {
                break;
            }
        }

        sink.flush().map_err(ChunksealError::SinkWrite)?;
        info!(
            cipher = cipher.name(),
            chunks = stats.chunks,
            plaintext_bytes = stats.plaintext_bytes,
            ciphertext_bytes = stats.ciphertext_bytes,
            batch_size,
            "decoded stream (parallel)"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{decode, encode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const KEY: [u8; 24] = [0x24; 24];

    fn make_data(size: usize) -> Vec<u8> {
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_parallel_matches_sequential_bytes() {
        let plaintext = make_data(5 * CHUNK_SIZE + 77);
        let encoder = Encoder::new(&KEY).unwrap();

        let sequential = encoder
            .encode_with_rng(plaintext.as_slice(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        let mut parallel = Vec::new();
        encoder
            .encode_parallel_to_with_rng(plaintext.as_slice(), &mut parallel, &mut StdRng::seed_from_u64(3), 2)
            .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_parallel_roundtrip_crosses_codecs() {
        let plaintext = make_data(7 * CHUNK_SIZE + 1);
        let encoder = Encoder::new(&KEY).unwrap();
        let decoder = Decoder::new(&KEY).unwrap();

        for batch_size in [0, 1, 3, 16] {
            let ciphertext = encoder.encode_parallel(plaintext.as_slice(), batch_size).unwrap();
            assert_eq!(decode(ciphertext.as_slice(), &KEY).unwrap(), plaintext);

            let sequential = encode(plaintext.as_slice(), &KEY).unwrap();
            assert_eq!(
                decoder.decode_parallel(sequential.as_slice(), batch_size).unwrap(),
                plaintext
            );
        }
    }

    #[test]
    fn test_parallel_empty_and_exact_batches() {
        let encoder = Encoder::new(&KEY).unwrap();
        assert!(encoder.encode_parallel(std::io::empty(), 4).unwrap().is_empty());

        let plaintext = make_data(4 * CHUNK_SIZE);
        let mut ciphertext = Vec::new();
        let stats = encoder
            .encode_parallel_to(plaintext.as_slice(), &mut ciphertext, 2)
            .unwrap();
        assert_eq!(stats.chunks, 4);
        assert_eq!(Decoder::new(&KEY).unwrap().decode_parallel(ciphertext.as_slice(), 2).unwrap(), plaintext);
    }

    #[test]
    fn test_parallel_decode_reports_failing_chunk() {
        let ciphertext = encode(make_data(6 * CHUNK_SIZE).as_slice(), &KEY).unwrap();
        let mut tampered = ciphertext.clone();
        tampered[4 * MAX_RECORD_SIZE + 20] ^= 0x01;

        let mut out = Vec::new();
        let err = Decoder::new(&KEY)
            .unwrap()
            .decode_parallel_to(tampered.as_slice(), &mut out, 3)
            .unwrap_err();
        assert!(matches!(err, ChunksealError::AuthenticationFailed { chunk: 4 }));
        // first batch (chunks 0..3) authenticated; the failing batch wrote nothing
        assert_eq!(out.len(), 3 * CHUNK_SIZE);
    }

    #[test]
    fn test_huge_batch_size_reads_only_what_arrives() {
        let encoder = Encoder::new(&KEY).unwrap();
        let ciphertext = encoder.encode_parallel(&b"abc"[..], usize::MAX).unwrap();
        assert_eq!(ciphertext.len(), 3 + crate::RECORD_OVERHEAD);

        let decoder = Decoder::new(&KEY).unwrap();
        assert_eq!(decoder.decode_parallel(ciphertext.as_slice(), usize::MAX).unwrap(), b"abc");
    }

    #[test]
    fn test_effective_batch_size() {
        assert_eq!(effective_batch_size(5), 5);
        assert!(effective_batch_size(0) >= 1);
    }
}
