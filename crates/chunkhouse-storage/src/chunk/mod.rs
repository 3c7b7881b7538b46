//! Chunk Storage Format
//!
//! This module implements the binary format for a self-contained, compressed,
//! checksummed chunk of log entries.
//!
//! ## Chunk Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header                                                      │
//! │ - Magic: 0x012EE56A (4 bytes, big-endian)                   │
//! │ - Format: 1 or 2 (1 byte)                                   │
//! │ - Encoding (1 byte, format v2 only; v1 implies gzip)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Block 1                                                     │
//! │ - Compressed payload                                        │
//! │ - CRC-32C of the payload (4 bytes)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Block 2 ...                                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Metadata                                                    │
//! │ - Block count (uvarint)                                     │
//! │ - Per block: entry count, mint, maxt, offset, length        │
//! │   (uvarint / svarint)                                       │
//! │ - CRC-32C of the metadata section (4 bytes)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Trailer                                                     │
//! │ - Metadata offset (8 bytes, big-endian)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Block Payload (after decompression)
//!
//! Entries are varint-framed and concatenated with no delimiter; the entry
//! count lives in the metadata section:
//!
//! ```text
//! Entry 1:
//!   - Timestamp (svarint, ZigZag, nanoseconds)
//!   - Line length (uvarint)
//!   - Line bytes
//! Entry 2:
//!   ...
//! ```
//!
//! ## Why This Design?
//!
//! ### Two-tier ingest
//! Appends land in an uncompressed head block; once the head crosses the block
//! size it is cut into an immutable compressed block. Readers stream sealed
//! blocks and snapshot the head, so a chunk serves queries while it is still
//! being written.
//!
//! ### Per-block checksums
//! Corruption is detected at block granularity: the loader hands back every
//! block it verified before the failure instead of discarding the chunk.
//!
//! ### Trailing metadata
//! Payloads are written first and the index afterwards, so sealing a chunk is
//! a single forward pass; the trailer's metadata offset makes the index
//! discoverable from the end of the buffer.

mod block;
mod head;
mod mem;

pub use block::Block;
pub use mem::{LoadError, MemChunk};

pub(crate) use head::HeadBlock;

/// Magic number identifying a chunk buffer
pub const CHUNK_MAGIC: u32 = 0x012E_E56A;

/// Original chunk format: no encoding byte, payloads always gzip
pub const CHUNK_FORMAT_V1: u8 = 1;

/// Current chunk format: encoding byte after the format byte
pub const CHUNK_FORMAT_V2: u8 = 2;

/// Default uncompressed head size that triggers a block cut (256 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Soft cap on blocks per chunk, used when no target size is configured
pub const BLOCKS_PER_CHUNK: usize = 10;

/// Hard limit on a single decoded line (1 GiB)
pub const MAX_LINE_LENGTH: usize = 1024 * 1024 * 1024;
