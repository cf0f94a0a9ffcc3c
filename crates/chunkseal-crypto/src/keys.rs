//! Caller-supplied symmetric keys: length validation, zeroize-on-drop

use zeroize::Zeroize;

use chunkseal_core::{ChunksealError, ChunksealResult};

/// Accepted key lengths, selecting AES-128, AES-192 or AES-256.
pub const KEY_SIZES: [usize; 3] = [16, 24, 32];

/// A validated AES-GCM key. Zeroized on drop.
#[derive(Clone)]
pub struct ChunkKey {
    bytes: Vec<u8>,
}

impl ChunkKey {
    /// Copy `bytes` into a new key, rejecting lengths other than 16, 24 or 32.
    pub fn from_slice(bytes: &[u8]) -> ChunksealResult<Self> {
        if !KEY_SIZES.contains(&bytes.len()) {
            return Err(ChunksealError::InvalidKeyLength { len: bytes.len() });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key strength in bits (128, 192 or 256).
    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }
}

impl Drop for ChunkKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkKey")
            .field("bits", &self.bits())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
