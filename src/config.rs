use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TransferError;

// Streaming tunables
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024; // 8KB
pub const MIN_CHUNK_SIZE: usize = 1024; // 1KB
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024; // 1MB

/// Tunables for the payload transfer engine.
///
/// The chunk size bounds each read and therefore the cancellation latency:
/// at most one chunk is read after a cancel request. There is no default
/// connect timeout; one exists only when configured here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    pub chunk_size: usize,
    pub connect_timeout_ms: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_ms: None,
        }
    }
}

impl TransferConfig {
    /// Clamp out-of-range tunables instead of failing on them.
    pub fn validated(mut self) -> Self {
        self.chunk_size = self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn load_or_create(path: &Path) -> Result<Self, TransferError> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| TransferError::Config(format!("read {}: {}", path.display(), e)))?;
            toml::from_str(&content)
                .map_err(|e| TransferError::Config(format!("parse {}: {}", path.display(), e)))
        } else {
            let config = Self::default();
            config.save(path)?;
            info!("Created default transfer config at {:?}", path);
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), TransferError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TransferError::Config(format!("serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| TransferError::Config(format!("write {}: {}", path.display(), e)))
    }
}
