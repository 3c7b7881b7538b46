//! Log Entry Data Structure
//!
//! This module defines the `Entry` type - the unit of data stored inside a chunk.
//!
//! ## What is an Entry?
//! An entry is a single log record:
//! - **timestamp**: When the line was emitted (nanoseconds since epoch)
//! - **line**: The raw log line bytes
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for the line so appends retain a cheap handle instead
//!   of copying the backing storage
//! - Timestamps are `i64` nanoseconds, matching the chunk wire format
//! - No labels live inside a chunk; the label/series model belongs to the
//!   surrounding store

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single log record inside a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Timestamp in nanoseconds since epoch
    pub timestamp: i64,

    /// Raw log line
    pub line: Bytes,
}

impl Entry {
    pub fn new(timestamp: i64, line: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            line: line.into(),
        }
    }

    /// Uncompressed size of this entry as accounted by the head block
    pub fn size(&self) -> usize {
        self.line.len()
    }
}
