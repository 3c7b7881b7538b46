//! Head Block - Uncompressed Staging for Recent Entries
//!
//! The head block buffers appends until the chunk cuts it into a compressed
//! block. It enforces the monotonic timestamp invariant and tracks the time
//! bounds and uncompressed size the cut will stamp onto the sealed block.

use crate::compression::WriterPool;
use crate::iter::{LineFilter, ListIterator};
use crate::pool::SERIALIZE_BUFFER_POOL;
use bytes::Bytes;
use chunkhouse_core::{varint, Entry, Error, Result};
use std::io::Write;

/// Mutable, uncompressed staging area for the most recent entries
#[derive(Debug, Default)]
pub(crate) struct HeadBlock {
    entries: Vec<Entry>,
    /// Uncompressed size of all buffered lines
    size: usize,
    mint: i64,
    maxt: i64,
}

impl HeadBlock {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn mint(&self) -> i64 {
        self.mint
    }

    pub(crate) fn maxt(&self) -> i64 {
        self.maxt
    }

    /// Buffer one entry. The line is retained by handle, not copied.
    pub(crate) fn append(&mut self, ts: i64, line: Bytes) -> Result<()> {
        if !self.is_empty() && self.maxt > ts {
            return Err(Error::OutOfOrder);
        }

        self.size += line.len();
        self.entries.push(Entry::new(ts, line));
        if self.mint == 0 || self.mint > ts {
            self.mint = ts;
        }
        self.maxt = ts;

        Ok(())
    }

    /// Encode every buffered entry and compress the result into a block payload
    pub(crate) fn serialize(&self, pool: &WriterPool) -> Result<Vec<u8>> {
        let mut scratch = SERIALIZE_BUFFER_POOL.get_guard();
        for entry in &self.entries {
            varint::encode_i64(&mut *scratch, entry.timestamp);
            varint::encode_u64(&mut *scratch, entry.line.len() as u64);
            scratch.extend_from_slice(&entry.line);
        }

        let mut writer = pool.writer(Vec::new())?;
        writer.write_all(&scratch)?;
        writer.finish()
    }

    /// Snapshot the buffered entries for reading.
    ///
    /// A copy is mandatory: the writer keeps appending to `entries` while the
    /// returned iterator is being drained. A range that doesn't overlap the
    /// head yields the empty iterator; the filter is applied at snapshot time.
    /// Per-entry time clipping happens a level up in the iterator stack.
    pub(crate) fn iterator(
        &self,
        mint: i64,
        maxt: i64,
        filter: Option<&LineFilter>,
    ) -> ListIterator {
        if self.is_empty() || maxt < self.mint || self.maxt < mint {
            return ListIterator::empty();
        }

        let entries: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| match filter {
                Some(f) => f(&e.line),
                None => true,
            })
            .cloned()
            .collect();

        if entries.is_empty() {
            return ListIterator::empty();
        }

        ListIterator::new(entries)
    }

    /// Clear the head after a cut. `maxt` is retained on purpose: append only
    /// consults it while the head is non-empty, and the chunk still checks new
    /// timestamps against the last sealed block.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.mint = 0;
        self.size = 0;
    }
}
