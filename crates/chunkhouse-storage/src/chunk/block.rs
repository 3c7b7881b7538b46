//! Sealed Compressed Block
//!
//! A block is produced by cutting the head (or by the chunk loader) and is
//! immutable from then on. The payload is compressed; decompressing it yields
//! exactly `num_entries` varint-framed records whose timestamps span
//! `[mint, maxt]` in non-decreasing order.

use crate::compression::ReaderPool;
use crate::iter::{BufferedIterator, EntryIterator, LineFilter, ListIterator};
use crate::stats::StatsContext;
use bytes::Bytes;

/// Immutable compressed block inside a chunk
#[derive(Debug, Clone)]
pub struct Block {
    /// Compressed payload
    pub(crate) data: Bytes,
    pub(crate) num_entries: usize,
    pub(crate) mint: i64,
    pub(crate) maxt: i64,
    /// Absolute byte offset of the payload within the serialized chunk
    pub(crate) offset: usize,
    /// Uncompressed payload size recorded at cut time; zero after a reload
    pub(crate) uncompressed_size: usize,
}

impl Block {
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    pub fn mint(&self) -> i64 {
        self.mint
    }

    pub fn maxt(&self) -> i64 {
        self.maxt
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// Streaming decoder over this block's payload
    pub(crate) fn iterator(
        &self,
        ctx: &StatsContext,
        pool: ReaderPool,
        filter: Option<LineFilter>,
    ) -> Box<dyn EntryIterator> {
        if self.data.is_empty() {
            return Box::new(ListIterator::empty());
        }
        Box::new(BufferedIterator::new(
            ctx.clone(),
            pool,
            self.data.clone(),
            filter,
        ))
    }
}
