//! Entry Iterators
//!
//! This module implements the iterator stack that turns sealed blocks and the
//! head snapshot into a single time-ordered stream of entries.
//!
//! ## Composition
//!
//! ```text
//! block payload ──► BufferedIterator ─┐
//! block payload ──► BufferedIterator ─┼─► NonOverlappingIterator
//! head snapshot ──► ListIterator ─────┘            │
//!                                                  ▼
//!                                        TimeRangedIterator
//!                                                  │
//!                              FORWARD ◄───────────┴──────────► BACKWARD
//!                              (as-is)                  (ReversedIterator)
//! ```
//!
//! ## Iterator Contract
//!
//! `next()` advances and returns false at end of stream or on the first error.
//! Only the first error is kept; it stays readable through `error()` after
//! `next()` has returned false. `close()` is idempotent and releases pooled
//! resources; the per-block iterator also reports its decompression counters
//! there, exactly once. Dropping an iterator closes it.

use crate::chunk::MAX_LINE_LENGTH;
use crate::compression::ReaderPool;
use crate::pool::{PooledBufReader, LINE_BUFFER_POOL};
use crate::stats::StatsContext;
use bytes::Bytes;
use chunkhouse_core::{varint, Entry, Error};
use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// Direction of iteration over a time range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Predicate over raw line bytes; entries failing it are skipped
pub type LineFilter = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Streaming iterator over chunk entries
pub trait EntryIterator {
    /// Advance to the next entry; false at end of stream or on error
    fn next(&mut self) -> bool;

    /// The entry positioned by the last successful `next`
    fn entry(&self) -> Entry;

    /// First error encountered, if any
    fn error(&self) -> Option<Arc<Error>>;

    /// Release resources; idempotent
    fn close(&mut self);
}

/// Iterator over an in-memory entry snapshot (head block, empty iterator)
pub struct ListIterator {
    entries: Vec<Entry>,
    pos: usize,
    cur: Option<Entry>,
}

impl ListIterator {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            pos: 0,
            cur: None,
        }
    }

    /// The shared empty iterator
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl EntryIterator for ListIterator {
    fn next(&mut self) -> bool {
        if self.pos < self.entries.len() {
            self.cur = Some(self.entries[self.pos].clone());
            self.pos += 1;
            true
        } else {
            self.cur = None;
            false
        }
    }

    fn entry(&self) -> Entry {
        self.cur.clone().unwrap_or_default()
    }

    fn error(&self) -> Option<Arc<Error>> {
        None
    }

    fn close(&mut self) {}
}

/// Streaming decoder over one compressed block payload
///
/// The decompressing reader is borrowed lazily on the first `next` call so an
/// iterator that is never driven costs nothing.
pub struct BufferedIterator {
    ctx: StatsContext,
    pool: ReaderPool,
    data: Bytes,
    compressed_len: usize,
    reader: Option<PooledBufReader<crate::compression::CompressionReader<Cursor<Bytes>>>>,
    line_buf: Vec<u8>,
    cur: Entry,
    err: Option<Arc<Error>>,
    bytes_decompressed: i64,
    closed: bool,
    filter: Option<LineFilter>,
}

impl BufferedIterator {
    pub fn new(
        ctx: StatsContext,
        pool: ReaderPool,
        data: Bytes,
        filter: Option<LineFilter>,
    ) -> Self {
        let compressed_len = data.len();
        Self {
            ctx,
            pool,
            data,
            compressed_len,
            reader: None,
            line_buf: Vec::new(),
            cur: Entry::default(),
            err: None,
            bytes_decompressed: 0,
            closed: false,
            filter,
        }
    }

    /// Decode one entry header and pull its line into the pooled buffer.
    /// Returns the timestamp and line length, or `None` at end of block.
    fn read_entry(&mut self) -> Result<Option<(i64, usize)>, Error> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Ok(None),
        };

        let ts = match varint::read_i64_opt(reader)? {
            Some(ts) => ts,
            None => return Ok(None),
        };
        let len = varint::read_u64(reader)? as usize;

        if len >= MAX_LINE_LENGTH {
            return Err(Error::LineTooLong {
                length: len,
                limit: MAX_LINE_LENGTH,
            });
        }

        if self.line_buf.capacity() < len {
            // swap the old buffer back before borrowing a bigger one
            if self.line_buf.capacity() > 0 {
                LINE_BUFFER_POOL.put(std::mem::take(&mut self.line_buf));
            }
            self.line_buf = LINE_BUFFER_POOL.get(len);
            if self.line_buf.capacity() < len {
                return Err(Error::BufferTooSmall {
                    requested: len,
                    actual: self.line_buf.capacity(),
                });
            }
        }

        self.line_buf.resize(len, 0);
        reader.read_exact(&mut self.line_buf[..len])?;

        // fixed over-estimate: line bytes plus both varints at maximum width
        self.bytes_decompressed += len as i64 + 2 * varint::MAX_VARINT_LEN as i64;

        Ok(Some((ts, len)))
    }

    fn fail(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(Arc::new(err));
        }
        self.close();
    }
}

impl EntryIterator for BufferedIterator {
    fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }

        if self.reader.is_none() {
            match self.pool.reader(Cursor::new(self.data.clone())) {
                Ok(r) => self.reader = Some(PooledBufReader::new(r)),
                Err(e) => {
                    self.fail(e);
                    return false;
                }
            }
        }

        loop {
            match self.read_entry() {
                Ok(Some((ts, len))) => {
                    if let Some(filter) = &self.filter {
                        if !filter(&self.line_buf[..len]) {
                            continue;
                        }
                    }
                    self.cur = Entry::new(ts, Bytes::copy_from_slice(&self.line_buf[..len]));
                    return true;
                }
                Ok(None) => {
                    self.close();
                    return false;
                }
                Err(e) => {
                    self.fail(e);
                    return false;
                }
            }
        }
    }

    fn entry(&self) -> Entry {
        self.cur.clone()
    }

    fn error(&self) -> Option<Arc<Error>> {
        self.err.clone()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.ctx
            .record(self.bytes_decompressed, self.compressed_len as i64);

        // dropping the reader returns its buffer to the read buffer pool
        self.reader = None;
        if self.line_buf.capacity() > 0 {
            LINE_BUFFER_POOL.put(std::mem::take(&mut self.line_buf));
        }
        self.data = Bytes::new();
    }
}

impl Drop for BufferedIterator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Concatenates iterators whose time ranges are already globally ordered
pub struct NonOverlappingIterator {
    iters: VecDeque<Box<dyn EntryIterator>>,
    err: Option<Arc<Error>>,
}

impl NonOverlappingIterator {
    pub fn new(iters: Vec<Box<dyn EntryIterator>>) -> Self {
        Self {
            iters: iters.into(),
            err: None,
        }
    }
}

impl EntryIterator for NonOverlappingIterator {
    fn next(&mut self) -> bool {
        while let Some(it) = self.iters.front_mut() {
            if it.next() {
                return true;
            }
            if self.err.is_none() {
                self.err = it.error();
            }
            it.close();
            self.iters.pop_front();
            if self.err.is_some() {
                return false;
            }
        }
        false
    }

    fn entry(&self) -> Entry {
        self.iters
            .front()
            .map(|it| it.entry())
            .unwrap_or_default()
    }

    fn error(&self) -> Option<Arc<Error>> {
        self.err.clone()
    }

    fn close(&mut self) {
        for it in &mut self.iters {
            it.close();
        }
        self.iters.clear();
    }
}

/// Clips an ordered stream to the half-open range `[mint, maxt)`
pub struct TimeRangedIterator {
    inner: Box<dyn EntryIterator>,
    mint: i64,
    maxt: i64,
    cur: Option<Entry>,
    err: Option<Arc<Error>>,
    closed: bool,
}

impl TimeRangedIterator {
    pub fn new(inner: Box<dyn EntryIterator>, mint: i64, maxt: i64) -> Self {
        Self {
            inner,
            mint,
            maxt,
            cur: None,
            err: None,
            closed: false,
        }
    }
}

impl EntryIterator for TimeRangedIterator {
    fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        loop {
            if !self.inner.next() {
                if self.err.is_none() {
                    self.err = self.inner.error();
                }
                self.close();
                return false;
            }
            let entry = self.inner.entry();
            if entry.timestamp < self.mint {
                continue;
            }
            if entry.timestamp >= self.maxt {
                // ordered input: nothing further can be in range
                self.close();
                return false;
            }
            self.cur = Some(entry);
            return true;
        }
    }

    fn entry(&self) -> Entry {
        self.cur.clone().unwrap_or_default()
    }

    fn error(&self) -> Option<Arc<Error>> {
        self.err.clone()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inner.close();
    }
}

/// Fully drains a forward iterator and re-emits it newest-first
pub struct ReversedIterator {
    entries: Vec<Entry>,
    cur: Option<Entry>,
    err: Option<Arc<Error>>,
}

impl ReversedIterator {
    pub fn new(mut inner: Box<dyn EntryIterator>) -> Self {
        let mut entries = Vec::new();
        while inner.next() {
            entries.push(inner.entry());
        }
        let err = inner.error();
        inner.close();
        Self {
            entries,
            cur: None,
            err,
        }
    }
}

impl EntryIterator for ReversedIterator {
    fn next(&mut self) -> bool {
        match self.entries.pop() {
            Some(entry) => {
                self.cur = Some(entry);
                true
            }
            None => {
                self.cur = None;
                false
            }
        }
    }

    fn entry(&self) -> Entry {
        self.cur.clone().unwrap_or_default()
    }

    fn error(&self) -> Option<Arc<Error>> {
        self.err.clone()
    }

    fn close(&mut self) {
        self.entries.clear();
    }
}
