//! ChunkHouse Storage Engine
//!
//! This crate implements the compressed log chunk: the unit of in-memory and
//! on-disk representation for time-ordered log records.
//!
//! ## What is a Chunk?
//!
//! A chunk ingests `(timestamp, line)` records in non-decreasing timestamp
//! order, compresses them into fixed-size blocks, and serializes to a
//! self-describing, checksummed byte buffer that can be reloaded later for
//! read-only time-range iteration with optional content filtering.
//!
//! ## Architecture Overview
//!
//! ```text
//! append(entry)
//!     │
//!     ▼
//! ┌──────────────┐  head reaches block size   ┌───────────────────┐
//! │  Head block  │ ─────────── cut ─────────► │ Compressed blocks │
//! │ (uncompressed│                            │ (immutable, CRC)  │
//! │   staging)   │                            └─────────┬─────────┘
//! └──────┬───────┘                                      │
//!        │                to_bytes / from_bytes         ▼
//!        │              ◄──────────────────────► serialized chunk
//!        ▼                                              │
//!  head snapshot ──┐                                    │
//!                  ├──► iterator stack ◄── one decoder per block
//!                  ▼
//!     time-ranged, direction-aware entry stream
//! ```
//!
//! ## Main Components
//!
//! - [`MemChunk`]: the chunk container (append, cut, sizes, bounds, serialize)
//! - [`EntryIterator`] and the iterator stack in [`iter`]
//! - [`ReaderPool`] / [`WriterPool`]: per-encoding compression codecs
//! - Byte buffer pools in [`pool`] keeping the hot paths allocation-flat
//! - [`DecompressionStats`]: per-query decompression accounting
//!
//! ## Usage Example
//!
//! ```ignore
//! use chunkhouse_storage::{Direction, Encoding, Entry, MemChunk, StatsContext};
//!
//! let mut chunk = MemChunk::new(Encoding::Lz4);
//! chunk.append(&Entry::new(ts_nanos, "log line"))?;
//!
//! // seal and ship
//! let bytes = chunk.to_bytes()?;
//!
//! // reload and query
//! let chunk = MemChunk::from_bytes(bytes)?;
//! let mut it = chunk.iterator(&StatsContext::new(), from, to, Direction::Forward, None);
//! while it.next() {
//!     handle(it.entry());
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! Writes to a single chunk are single-threaded; reads may run concurrently
//! with writes because sealed blocks are immutable and the head block is
//! snapshotted at iterator construction. The buffer pools are process-wide and
//! internally synchronized.

pub mod chunk;
pub mod compression;
pub mod config;
pub mod iter;
pub mod pool;
pub mod stats;

pub use chunk::{
    Block, LoadError, MemChunk, BLOCKS_PER_CHUNK, CHUNK_FORMAT_V1, CHUNK_FORMAT_V2, CHUNK_MAGIC,
    DEFAULT_BLOCK_SIZE, MAX_LINE_LENGTH,
};
pub use compression::{CompressionReader, CompressionWriter, ReaderPool, WriterPool};
pub use config::ChunkConfig;
pub use iter::{
    BufferedIterator, Direction, EntryIterator, LineFilter, ListIterator,
    NonOverlappingIterator, ReversedIterator, TimeRangedIterator,
};
pub use stats::{DecompressionStats, StatsContext};

pub use chunkhouse_core::{Encoding, Entry, Error, Result};
