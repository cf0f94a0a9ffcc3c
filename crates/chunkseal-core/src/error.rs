use thiserror::Error;

pub type ChunksealResult<T> = Result<T, ChunksealError>;

#[derive(Debug, Error)]
pub enum ChunksealError {
    #[error("invalid key length: {len} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength { len: usize },

    #[error("reading source: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("writing output: {0}")]
    SinkWrite(#[source] std::io::Error),

    /// Tag mismatch or a record too short to carry a nonce and tag.
    #[error("authentication failed at chunk {chunk}: corrupted, truncated, or wrong key")]
    AuthenticationFailed { chunk: u64 },

    #[error("secure random source unavailable: {0}")]
    RandomnessUnavailable(#[source] rand::Error),

    #[error("AEAD seal failed at chunk {chunk}")]
    Seal { chunk: u64 },

    #[error("config error: {0}")]
    Config(String),
}

impl ChunksealError {
    /// True for failures that mean the ciphertext cannot be trusted.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, ChunksealError::AuthenticationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_never_mentions_key_bytes() {
        let err = ChunksealError::InvalidKeyLength { len: 8 };
        assert_eq!(
            err.to_string(),
            "invalid key length: 8 bytes (expected 16, 24 or 32)"
        );
    }

    #[test]
    fn test_source_read_keeps_cause() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = ChunksealError::SourceRead(io);
        let source = err.source().expect("io error is the source");
        assert_eq!(source.to_string(), "pipe closed");
    }

    #[test]
    fn test_is_authentication_failure() {
        assert!(ChunksealError::AuthenticationFailed { chunk: 3 }.is_authentication_failure());
        assert!(!ChunksealError::Seal { chunk: 3 }.is_authentication_failure());
    }
}
