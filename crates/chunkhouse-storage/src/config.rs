//! Chunk Configuration
//!
//! This module defines configuration for chunk construction.
//!
//! ## ChunkConfig
//!
//! - **encoding**: Block payload compression (default: gzip)
//! - **block_size**: Uncompressed head bytes that trigger a block cut
//!   (default: 256 KiB)
//! - **target_size**: Desired chunk size in compressed bytes; zero keeps the
//!   legacy ten-blocks-per-chunk behavior (default: 0)
//!
//! ## Usage
//!
//! ```ignore
//! use chunkhouse_storage::{ChunkConfig, MemChunk};
//!
//! let config = ChunkConfig {
//!     encoding: Encoding::Lz4,
//!     target_size: 1536 * 1024,
//!     ..Default::default()
//! };
//! let chunk = MemChunk::with_config(&config);
//! ```

use crate::chunk::DEFAULT_BLOCK_SIZE;
use chunkhouse_core::Encoding;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Block payload compression (default: gzip)
    #[serde(default)]
    pub encoding: Encoding,

    /// Uncompressed head bytes that trigger a cut (default: 256 KiB)
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Target chunk size in compressed bytes; 0 disables target-based sealing
    #[serde(default)]
    pub target_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::default(),
            block_size: default_block_size(),
            target_size: 0,
        }
    }
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}
