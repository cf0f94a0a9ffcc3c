use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChunksealError, ChunksealResult};

/// Largest accepted `codec.batch_size`. Each slot holds up to one record
/// window, so this bounds a batch to roughly 256 MiB.
pub const MAX_BATCH_SIZE: usize = 4096;

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunksealConfig {
    pub log: LogConfig,
    pub key: KeyConfig,
    pub codec: CodecConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// File holding the base64-encoded key, used when no key is given on the command line
    pub key_file: Option<PathBuf>,
}

/// Codec tuning. The chunk size is a wire constant and deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Seal/open chunks on the rayon pool (default: false)
    pub parallel: bool,
    /// Chunks per parallel batch (0 = rayon thread count)
    pub batch_size: usize,
}

impl CodecConfig {
    pub fn validate(&self) -> ChunksealResult<()> {
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ChunksealError::Config(format!(
                "codec.batch_size = {} exceeds the maximum of {MAX_BATCH_SIZE}",
                self.batch_size
            )));
        }
        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ChunksealConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist. Does not log: this runs before the subscriber is installed.
    pub fn load(path: &Path) -> ChunksealResult<Self> {
        let path = expand_home(path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ChunksealError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ChunksealError::Config(format!("parsing {}: {e}", path.display())))?;
        config.codec.validate()?;
        Ok(config)
    }
}

/// Expand a leading `~/` using `$HOME`. Other paths are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
