//! In-memory Chunk Container
//!
//! `MemChunk` orchestrates the two-tier ingest path: appends land in the
//! uncompressed head block, the head is cut into sealed compressed blocks, and
//! the whole chunk serializes to the checksummed byte layout described in the
//! module docs of [`crate::chunk`].
//!
//! ## Write Path
//! `append` → head block → (head reaches the block size) → `cut` compresses
//! the head into a [`Block`] and resets it. `to_bytes` performs a final cut
//! and emits the wire format.
//!
//! ## Read Path
//! `from_bytes` validates magic, format and checksums, then rebuilds the chunk
//! with zero-copy payload slices. `iterator` stacks one streaming decoder per
//! overlapping block plus a head snapshot into a single time-ranged,
//! direction-aware stream.

use super::{
    Block, HeadBlock, BLOCKS_PER_CHUNK, CHUNK_FORMAT_V1, CHUNK_FORMAT_V2, CHUNK_MAGIC,
    DEFAULT_BLOCK_SIZE,
};
use crate::compression::{ReaderPool, WriterPool};
use crate::config::ChunkConfig;
use crate::iter::{
    Direction, EntryIterator, LineFilter, NonOverlappingIterator, ReversedIterator,
    TimeRangedIterator,
};
use crate::stats::StatsContext;
use bytes::{BufMut, Bytes, BytesMut};
use chunkhouse_core::{varint, Encoding, Entry, Error, Result};
use std::io;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// Error returned by [`MemChunk::from_bytes`]
///
/// When a block payload fails its checksum, `partial` carries the chunk with
/// every block that verified before the failure, so callers can still read the
/// recoverable prefix.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct LoadError {
    pub error: Error,
    pub partial: Option<MemChunk>,
}

impl From<Error> for LoadError {
    fn from(error: Error) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

/// Compressed log chunk being built or queried in memory
#[derive(Debug)]
pub struct MemChunk {
    /// Uncompressed head bytes that trigger a cut
    block_size: usize,
    /// Target chunk size in compressed bytes; zero disables target sealing
    target_size: usize,

    /// Finished blocks
    blocks: Vec<Block>,
    /// Compressed size of all finished blocks
    cut_block_size: usize,

    /// Current in-memory block being appended to
    head: HeadBlock,

    format: u8,
    encoding: Encoding,

    readers: ReaderPool,
    writers: WriterPool,
}

impl MemChunk {
    /// New chunk with the default block size and no target size
    pub fn new(encoding: Encoding) -> Self {
        Self::with_size(encoding, DEFAULT_BLOCK_SIZE, 0)
    }

    /// New chunk with explicit block and target sizes
    pub fn with_size(encoding: Encoding, block_size: usize, target_size: usize) -> Self {
        Self {
            block_size,
            target_size,
            blocks: Vec::new(),
            cut_block_size: 0,
            head: HeadBlock::default(),
            format: CHUNK_FORMAT_V2,
            encoding,
            readers: ReaderPool::new(encoding),
            writers: WriterPool::new(encoding),
        }
    }

    /// New chunk from a [`ChunkConfig`]
    pub fn with_config(config: &ChunkConfig) -> Self {
        Self::with_size(config.encoding, config.block_size, config.target_size)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Append one entry.
    ///
    /// Fails with `OutOfOrder` if the timestamp precedes what the chunk
    /// already holds; the chunk is unchanged in that case. Crossing the block
    /// size triggers a cut.
    pub fn append(&mut self, entry: &Entry) -> Result<()> {
        let ts = entry.timestamp;

        // the head alone can't see ordering across a cut boundary
        if self.head.is_empty() {
            if let Some(last) = self.blocks.last() {
                if last.maxt > ts {
                    return Err(Error::OutOfOrder);
                }
            }
        }

        self.head.append(ts, entry.line.clone())?;

        if self.head.size() >= self.block_size {
            return self.cut();
        }

        Ok(())
    }

    /// Whether the chunk can admit one more entry of this size.
    ///
    /// With a target size this compares uncompressed bytes against the
    /// compressed-size target: an over-conservative bound, so the only
    /// direction of error is sealing slightly early.
    pub fn space_for(&self, entry: &Entry) -> bool {
        if self.target_size > 0 {
            let new_head_size = self.head.size() + entry.size();
            return self.cut_block_size + new_head_size < self.target_size;
        }
        self.blocks.len() < BLOCKS_PER_CHUNK
    }

    /// Total entry count across sealed blocks and the head
    pub fn size(&self) -> usize {
        let mut entries: usize = self.blocks.iter().map(|b| b.num_entries).sum();
        entries += self.head.len();
        entries
    }

    /// Number of sealed blocks
    pub fn blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn uncompressed_size(&self) -> usize {
        let mut size = self.head.size();
        size += self
            .blocks
            .iter()
            .map(|b| b.uncompressed_size)
            .sum::<usize>();
        size
    }

    /// Compressed size of sealed blocks plus the head counted uncompressed.
    /// Counting the head raw over-reports, which beats ignoring it.
    pub fn compressed_size(&self) -> usize {
        self.head.size() + self.cut_block_size
    }

    pub fn utilization(&self) -> f64 {
        if self.target_size > 0 {
            return self.compressed_size() as f64 / self.target_size as f64;
        }
        self.uncompressed_size() as f64 / (BLOCKS_PER_CHUNK * self.block_size) as f64
    }

    /// Time bounds `(from, to)` over sealed blocks and the head, in nanoseconds
    pub fn bounds(&self) -> (i64, i64) {
        let mut from = 0i64;
        let mut to = 0i64;

        if let (Some(first), Some(last)) = (self.blocks.first(), self.blocks.last()) {
            from = first.mint;
            to = last.maxt;
        }

        if !self.head.is_empty() {
            if from == 0 || from > self.head.mint() {
                from = self.head.mint();
            }
            if to < self.head.maxt() {
                to = self.head.maxt();
            }
        }

        (from, to)
    }

    /// Flush the head into a sealed block. Appending afterwards is not part of
    /// the contract.
    pub fn close(&mut self) -> Result<()> {
        self.cut()
    }

    /// Seal the head into a compressed block and reset it in place.
    /// All-or-nothing: a compression failure leaves the head untouched.
    fn cut(&mut self) -> Result<()> {
        if self.head.is_empty() {
            return Ok(());
        }

        let data = self.head.serialize(&self.writers)?;

        debug!(
            entries = self.head.len(),
            uncompressed = self.head.size(),
            compressed = data.len(),
            encoding = %self.encoding,
            "cut head block"
        );

        self.cut_block_size += data.len();
        self.blocks.push(Block {
            data: Bytes::from(data),
            num_entries: self.head.len(),
            mint: self.head.mint(),
            maxt: self.head.maxt(),
            offset: 0,
            uncompressed_size: self.head.size(),
        });

        self.head.reset();

        Ok(())
    }

    /// Iterate entries in `[mint, maxt)`, optionally filtered, in the given
    /// direction. Safe to call while appends continue: sealed blocks are
    /// immutable and the head is snapshotted.
    pub fn iterator(
        &self,
        ctx: &StatsContext,
        mint: i64,
        maxt: i64,
        direction: Direction,
        filter: Option<LineFilter>,
    ) -> Box<dyn EntryIterator> {
        let mut iters: Vec<Box<dyn EntryIterator>> = Vec::with_capacity(self.blocks.len() + 1);

        for block in &self.blocks {
            if maxt > block.mint && block.maxt > mint {
                iters.push(block.iterator(ctx, self.readers, filter.clone()));
            }
        }

        if !self.head.is_empty() {
            iters.push(Box::new(self.head.iterator(mint, maxt, filter.as_ref())));
        }

        let forward = TimeRangedIterator::new(
            Box::new(NonOverlappingIterator::new(iters)),
            mint,
            maxt,
        );

        match direction {
            Direction::Forward => Box::new(forward),
            Direction::Backward => Box::new(ReversedIterator::new(Box::new(forward))),
        }
    }

    /// Serialize the chunk to its wire format, flushing the head first
    pub fn to_bytes(&mut self) -> Result<Bytes> {
        self.cut()?;

        let mut buf = BytesMut::with_capacity(self.cut_block_size + 1024);

        // header
        buf.put_u32(CHUNK_MAGIC);
        buf.put_u8(self.format);
        if self.format == CHUNK_FORMAT_V2 {
            buf.put_u8(self.encoding.as_u8());
        }

        // blocks, each followed by its payload checksum
        for block in &mut self.blocks {
            block.offset = buf.len();
            buf.put_slice(&block.data);
            buf.put_u32(crc32c::crc32c(&block.data));
        }

        // metadata
        let metadata_offset = buf.len();
        varint::encode_u64(&mut buf, self.blocks.len() as u64);
        for block in &self.blocks {
            varint::encode_u64(&mut buf, block.num_entries as u64);
            varint::encode_i64(&mut buf, block.mint);
            varint::encode_i64(&mut buf, block.maxt);
            varint::encode_u64(&mut buf, block.offset as u64);
            varint::encode_u64(&mut buf, block.data.len() as u64);
        }
        let meta_crc = crc32c::crc32c(&buf[metadata_offset..]);
        buf.put_u32(meta_crc);

        // trailer
        buf.put_u64(metadata_offset as u64);

        Ok(buf.freeze())
    }

    /// Rebuild a chunk from its wire format.
    ///
    /// The metadata checksum is verified before anything is parsed. Block
    /// payloads are referenced zero-copy out of the input buffer and verified
    /// one by one; on a payload checksum mismatch the error carries the chunk
    /// with every block that passed. The head comes back empty.
    pub fn from_bytes(b: Bytes) -> std::result::Result<MemChunk, LoadError> {
        if b.len() < 5 {
            return Err(Error::from(truncated("header")).into());
        }

        let magic = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        if magic != CHUNK_MAGIC {
            return Err(Error::InvalidMagic(magic).into());
        }

        let format = b[4];
        let encoding = match format {
            CHUNK_FORMAT_V1 => Encoding::Gzip,
            CHUNK_FORMAT_V2 => {
                if b.len() < 6 {
                    return Err(Error::from(truncated("encoding byte")).into());
                }
                Encoding::try_from(b[5]).map_err(LoadError::from)?
            }
            version => return Err(Error::InvalidVersion(version).into()),
        };

        if b.len() < 12 {
            return Err(Error::from(truncated("trailer")).into());
        }
        let crc_pos = b.len() - 12;
        let mut off_bytes = [0u8; 8];
        off_bytes.copy_from_slice(&b[b.len() - 8..]);
        let metadata_offset = u64::from_be_bytes(off_bytes) as usize;
        if metadata_offset > crc_pos {
            return Err(Error::from(malformed("metadata offset out of range")).into());
        }

        let meta = &b[metadata_offset..crc_pos];
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&b[crc_pos..crc_pos + 4]);
        if u32::from_be_bytes(crc_bytes) != crc32c::crc32c(meta) {
            return Err(Error::InvalidChecksum.into());
        }

        let mut cur: &[u8] = meta;
        let num_blocks = varint::read_u64(&mut cur).map_err(Error::from)? as usize;

        let mut chunk = MemChunk {
            block_size: DEFAULT_BLOCK_SIZE,
            target_size: 0,
            blocks: Vec::new(),
            cut_block_size: 0,
            head: HeadBlock::default(),
            format,
            encoding,
            readers: ReaderPool::new(encoding),
            writers: WriterPool::new(encoding),
        };

        for index in 0..num_blocks {
            let num_entries = varint::read_u64(&mut cur).map_err(Error::from)? as usize;
            let mint = varint::read_i64(&mut cur).map_err(Error::from)?;
            let maxt = varint::read_i64(&mut cur).map_err(Error::from)?;
            let offset = varint::read_u64(&mut cur).map_err(Error::from)? as usize;
            let length = varint::read_u64(&mut cur).map_err(Error::from)? as usize;

            let end = match offset.checked_add(length) {
                Some(end) if end.checked_add(4).is_some_and(|p| p <= b.len()) => end,
                _ => return Err(Error::from(malformed("block bounds out of range")).into()),
            };

            let data = b.slice(offset..end);
            crc_bytes.copy_from_slice(&b[end..end + 4]);
            if u32::from_be_bytes(crc_bytes) != crc32c::crc32c(&data) {
                warn!(block = index, offset, length, "block checksum mismatch");
                return Err(LoadError {
                    error: Error::InvalidChecksum,
                    partial: Some(chunk),
                });
            }

            chunk.cut_block_size += data.len();
            chunk.blocks.push(Block {
                data,
                num_entries,
                mint,
                maxt,
                offset,
                uncompressed_size: 0,
            });
        }

        Ok(chunk)
    }
}

fn truncated(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("chunk truncated reading {what}"),
    )
}

fn malformed(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, what.to_string())
}
