//! Buffer Pools
//!
//! This module implements the process-wide byte buffer pools used by the chunk
//! engine to keep allocation pressure flat on the hot read and write paths.
//!
//! ## Pools
//!
//! - **Line buffer pool** (`BytesPool`): bucketed by capacity; the per-block
//!   iterator borrows a buffer large enough for the next line and swaps it for
//!   a bigger one only when a longer line shows up
//! - **Serialize buffer pool** (`BufferPool`): scratch space for the head
//!   block's uncompressed encoding before it is fed to the compressor
//! - **Read buffer pool** (`BufferPool`): backing buffers for the
//!   line-buffered readers stacked on top of the decompressing streams
//!
//! ## Thread Safety
//!
//! All pools are global statics synchronized with `std::sync::Mutex`. A
//! borrowed buffer is single-owner until it is returned. The `PooledBuf` guard
//! and the `Drop` impl on `PooledBufReader` return buffers on every exit path,
//! including unwinding.

use lazy_static::lazy_static;
use std::io::{self, Read};
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Smallest bucket in the line buffer pool
const MIN_LINE_BUFFER_SIZE: usize = 256;

/// Largest bucket in the line buffer pool; bigger lines get one-off allocations
const MAX_LINE_BUFFER_SIZE: usize = 64 * 1024;

/// Buffers kept per bucket; extras are dropped so idle pools don't pin memory
const MAX_POOLED_PER_BUCKET: usize = 64;

/// Capacity of the buffered readers stacked on decompressing streams
pub(crate) const READ_BUFFER_SIZE: usize = 8 * 1024;

lazy_static! {
    /// Line buffers borrowed by per-block iterators
    pub(crate) static ref LINE_BUFFER_POOL: BytesPool =
        BytesPool::new(MIN_LINE_BUFFER_SIZE, MAX_LINE_BUFFER_SIZE);

    /// Scratch buffers for head block serialization
    pub(crate) static ref SERIALIZE_BUFFER_POOL: BufferPool = BufferPool::new(8);

    /// Backing buffers for `PooledBufReader`
    pub(crate) static ref READ_BUFFER_POOL: BufferPool = BufferPool::new(32);
}

/// Capacity-bucketed pool of byte buffers
///
/// `get(size)` always returns a buffer with `capacity >= size`. Buckets double
/// from the minimum to the maximum size; requests past the largest bucket are
/// served with a direct allocation and dropped on return.
pub struct BytesPool {
    buckets: Vec<Bucket>,
}

struct Bucket {
    size: usize,
    items: Mutex<Vec<Vec<u8>>>,
}

impl BytesPool {
    pub fn new(min_size: usize, max_size: usize) -> Self {
        let mut buckets = Vec::new();
        let mut size = min_size.max(1);
        while size <= max_size {
            buckets.push(Bucket {
                size,
                items: Mutex::new(Vec::new()),
            });
            size *= 2;
        }
        Self { buckets }
    }

    /// Borrow a buffer with `capacity >= size`
    pub fn get(&self, size: usize) -> Vec<u8> {
        for bucket in &self.buckets {
            if bucket.size >= size {
                let mut items = lock(&bucket.items);
                if let Some(buf) = items.pop() {
                    return buf;
                }
                return Vec::with_capacity(bucket.size);
            }
        }
        Vec::with_capacity(size)
    }

    /// Return a buffer; it is cleared and re-slotted by capacity
    pub fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        let cap = buf.capacity();

        let mut target = None;
        for bucket in &self.buckets {
            if bucket.size <= cap {
                target = Some(bucket);
            } else {
                break;
            }
        }

        if let Some(bucket) = target {
            let mut items = lock(&bucket.items);
            if items.len() < MAX_POOLED_PER_BUCKET {
                items.push(buf);
            }
        }
    }
}

/// Simple LIFO pool of same-purpose byte buffers
pub struct BufferPool {
    items: Mutex<Vec<Vec<u8>>>,
    max_items: usize,
}

impl BufferPool {
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            max_items,
        }
    }

    /// Borrow a cleared buffer; capacity is whatever the last user grew it to
    pub fn get(&self) -> Vec<u8> {
        lock(&self.items).pop().unwrap_or_default()
    }

    /// Borrow a buffer behind an RAII guard that returns it on drop
    pub fn get_guard(&'static self) -> PooledBuf {
        PooledBuf {
            buf: self.get(),
            pool: self,
        }
    }

    pub fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut items = lock(&self.items);
        if items.len() < self.max_items {
            items.push(buf);
        }
    }
}

/// RAII guard over a buffer borrowed from a [`BufferPool`]
pub struct PooledBuf {
    buf: Vec<u8>,
    pool: &'static BufferPool,
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

/// Buffered reader whose internal buffer is borrowed from the read buffer pool
///
/// Varint decoding reads one byte at a time; going through a pooled buffer
/// keeps those reads off the decompressor. Reads larger than the buffer bypass
/// it entirely. The buffer goes back to the pool when the reader is dropped.
pub(crate) struct PooledBufReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
}

impl<R: Read> PooledBufReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        let mut buf = READ_BUFFER_POOL.get();
        buf.resize(READ_BUFFER_SIZE, 0);
        Self {
            inner,
            buf,
            pos: 0,
            filled: 0,
        }
    }
}

impl<R: Read> Read for PooledBufReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.filled {
            if out.len() >= self.buf.len() {
                return self.inner.read(out);
            }
            self.filled = self.inner.read(&mut self.buf)?;
            self.pos = 0;
            if self.filled == 0 {
                return Ok(0);
            }
        }

        let n = out.len().min(self.filled - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R> Drop for PooledBufReader<R> {
    fn drop(&mut self) {
        READ_BUFFER_POOL.put(std::mem::take(&mut self.buf));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // BytesPool
    // ---------------------------------------------------------------

    #[test]
    fn test_bytes_pool_capacity_at_least_requested() {
        let pool = BytesPool::new(256, 64 * 1024);
        for size in [0, 1, 255, 256, 257, 1000, 64 * 1024, 1 << 20] {
            let buf = pool.get(size);
            assert!(buf.capacity() >= size, "requested {size}");
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_bytes_pool_reuses_returned_buffer() {
        let pool = BytesPool::new(256, 4096);
        let mut buf = pool.get(300);
        buf.extend_from_slice(&[1, 2, 3]);
        let ptr = buf.as_ptr();
        pool.put(buf);

        let again = pool.get(300);
        assert_eq!(again.as_ptr(), ptr);
        assert!(again.is_empty());
    }

    #[test]
    fn test_bytes_pool_drops_undersized_buffers() {
        let pool = BytesPool::new(256, 4096);
        // below the smallest bucket: silently dropped
        pool.put(Vec::with_capacity(10));
        let buf = pool.get(1);
        assert!(buf.capacity() >= 256);
    }

    #[test]
    fn test_bytes_pool_oversized_request_allocates() {
        let pool = BytesPool::new(256, 1024);
        let buf = pool.get(10_000);
        assert!(buf.capacity() >= 10_000);
    }

    #[test]
    fn test_bytes_pool_oversized_return_lands_in_largest_bucket() {
        let pool = BytesPool::new(256, 1024);
        pool.put(Vec::with_capacity(10_000));
        // anything up to the largest bucket can now be served by that buffer
        let buf = pool.get(1024);
        assert!(buf.capacity() >= 1024);
    }

    // ---------------------------------------------------------------
    // BufferPool / PooledBuf
    // ---------------------------------------------------------------

    #[test]
    fn test_buffer_pool_roundtrip() {
        let pool = BufferPool::new(4);
        let mut buf = pool.get();
        buf.extend_from_slice(b"scratch");
        let cap = buf.capacity();
        pool.put(buf);

        let again = pool.get();
        assert!(again.is_empty());
        assert_eq!(again.capacity(), cap);
    }

    #[test]
    fn test_buffer_pool_bounded() {
        let pool = BufferPool::new(1);
        pool.put(Vec::with_capacity(100));
        pool.put(Vec::with_capacity(200)); // dropped
        let first = pool.get();
        let second = pool.get();
        assert_eq!(first.capacity(), 100);
        assert_eq!(second.capacity(), 0);
    }

    #[test]
    fn test_pooled_buf_returns_on_drop() {
        let pool: &'static BufferPool = Box::leak(Box::new(BufferPool::new(4)));
        {
            let mut guard = pool.get_guard();
            guard.extend_from_slice(b"some scratch data");
            assert!(guard.capacity() >= 17);
        }
        let buf = pool.get();
        assert!(buf.capacity() >= 17);
    }

    // ---------------------------------------------------------------
    // PooledBufReader
    // ---------------------------------------------------------------

    #[test]
    fn test_pooled_buf_reader_small_reads() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut reader = PooledBufReader::new(data.as_slice());

        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte).unwrap() {
                0 => break,
                _ => out.push(byte[0]),
            }
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_pooled_buf_reader_large_read_bypasses_buffer() {
        let data = vec![7u8; READ_BUFFER_SIZE * 2];
        let mut reader = PooledBufReader::new(data.as_slice());

        let mut out = vec![0u8; READ_BUFFER_SIZE * 2];
        reader.read_exact(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_pooled_buf_reader_mixed_reads() {
        let data: Vec<u8> = (0..255u8).cycle().take(20_000).collect();
        let mut reader = PooledBufReader::new(data.as_slice());

        let mut head = [0u8; 3];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, &data[..3]);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, &data[3..]);
    }
}
