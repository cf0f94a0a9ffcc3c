//! AES-GCM primitive, variant selected by key length
//!
//! All variants use a 96-bit nonce and a 128-bit tag. Associated data is always
//! empty: records are bound to nothing but their key.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};

use chunkseal_core::{ChunksealError, ChunksealResult};

use crate::keys::ChunkKey;
use crate::NONCE_SIZE;

/// AES-192 in GCM mode with the standard 96-bit nonce.
pub type Aes192Gcm = AesGcm<Aes192, U12>;

#[derive(Clone)]
pub enum GcmCipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl GcmCipher {
    pub fn new(key: &ChunkKey) -> ChunksealResult<Self> {
        let bytes = key.as_bytes();
        let len = bytes.len();
        let cipher = match len {
            16 => Aes128Gcm::new_from_slice(bytes).map(Self::Aes128),
            24 => Aes192Gcm::new_from_slice(bytes).map(Self::Aes192),
            32 => Aes256Gcm::new_from_slice(bytes).map(Self::Aes256),
            _ => return Err(ChunksealError::InvalidKeyLength { len }),
        };
        cipher.map_err(|_| ChunksealError::InvalidKeyLength { len })
    }

    /// Encrypt `plaintext`, returning `ciphertext || tag`.
    pub fn seal(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        match self {
            Self::Aes128(c) => c.encrypt(nonce, plaintext),
            Self::Aes192(c) => c.encrypt(nonce, plaintext),
            Self::Aes256(c) => c.encrypt(nonce, plaintext),
        }
    }

    /// Verify and decrypt `ciphertext || tag`. No plaintext is produced on failure.
    pub fn open(&self, nonce: &[u8; NONCE_SIZE], sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        match self {
            Self::Aes128(c) => c.decrypt(nonce, sealed),
            Self::Aes192(c) => c.decrypt(nonce, sealed),
            Self::Aes256(c) => c.decrypt(nonce, sealed),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes128(_) => "AES-128-GCM",
            Self::Aes192(_) => "AES-192-GCM",
            Self::Aes256(_) => "AES-256-GCM",
        }
    }
}

impl std::fmt::Debug for GcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GcmCipher").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TAG_SIZE;

    fn cipher(len: usize) -> GcmCipher {
        GcmCipher::new(&ChunkKey::from_slice(&vec![0x5Au8; len]).unwrap()).unwrap()
    }

    #[test]
    fn test_variant_follows_key_length() {
        assert_eq!(cipher(16).name(), "AES-128-GCM");
        assert_eq!(cipher(24).name(), "AES-192-GCM");
        assert_eq!(cipher(32).name(), "AES-256-GCM");
    }

    #[test]
    fn test_seal_open_roundtrip_all_variants() {
        let nonce = [3u8; NONCE_SIZE];
        for len in [16, 24, 32] {
            let c = cipher(len);
            let sealed = c.seal(&nonce, b"gcm chunk").unwrap();
            assert_eq!(sealed.len(), b"gcm chunk".len() + TAG_SIZE);
            assert_eq!(c.open(&nonce, &sealed).unwrap(), b"gcm chunk");
        }
    }

    #[test]
    fn test_open_rejects_wrong_nonce() {
        let c = cipher(32);
        let sealed = c.seal(&[1u8; NONCE_SIZE], b"data").unwrap();
        assert!(c.open(&[2u8; NONCE_SIZE], &sealed).is_err());
    }

    #[test]
    fn test_variants_do_not_interoperate() {
        let nonce = [9u8; NONCE_SIZE];
        let sealed = cipher(16).seal(&nonce, b"data").unwrap();
        assert!(cipher(32).open(&nonce, &sealed).is_err());
    }
}
