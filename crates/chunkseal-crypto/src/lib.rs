//! chunkseal-crypto: chunked authenticated encryption for arbitrarily large streams
//!
//! Architecture: Chunk-then-Seal with AES-GCM (128/192/256 selected by key length)
//!
//! The plaintext is cut into fixed windows of [`CHUNK_SIZE`] bytes; each window
//! is sealed independently under a fresh random 96-bit nonce and the records
//! are concatenated:
//! ```text
//! stream := record*
//! record := nonce (12 bytes) || ciphertext (1..=CHUNK_SIZE bytes) || tag (16 bytes)
//! ```
//! There is no header, length prefix, or chunk count. A reader recovers record
//! boundaries by reading windows of [`MAX_RECORD_SIZE`] bytes; only the last
//! record of a stream may be shorter. Empty plaintext encodes to an empty stream.
//! Because nothing marks the final record, a stream truncated exactly at a
//! record boundary cannot be detected: it decodes to the matching plaintext
//! prefix. Any other truncation fails authentication.
//!
//! # Chunk size
//! Random 96-bit nonces stay safely below the collision birthday bound for up to
//! 2^32 seals under one key. At 64 KiB per chunk that is 256 TiB of plaintext
//! per key, while keeping per-call buffers small and well under GCM's
//! 64 GiB single-invocation limit. Any compatible decoder must use the same
//! constant: it is not recorded in the stream.

pub mod cipher;
pub mod keys;
pub mod parallel;
pub mod record;
pub mod stream;

pub use chunkseal_core::{ChunksealError, ChunksealResult};
pub use cipher::GcmCipher;
pub use keys::ChunkKey;
pub use record::{open_record, seal_record, split_records, RecordRef};
pub use stream::{decode, encode, Decoder, Encoder, StreamStats};

/// Plaintext bytes sealed per AEAD invocation (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Bytes each record adds on top of its plaintext.
pub const RECORD_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Largest possible record; the decoder's read window.
pub const MAX_RECORD_SIZE: usize = CHUNK_SIZE + RECORD_OVERHEAD;
