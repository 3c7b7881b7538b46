//! Error Types for ChunkHouse
//!
//! This module defines all error types that can occur while building, encoding,
//! loading or iterating chunks.
//!
//! ## Error Categories
//!
//! ### Write-path Errors
//! - `OutOfOrder`: Append with a timestamp older than what the chunk already holds
//!
//! ### Data Integrity Errors
//! - `InvalidMagic`: Chunk buffer doesn't start with the expected magic number
//! - `InvalidVersion`: Unknown chunk format byte
//! - `InvalidEncoding`: Unknown block encoding byte
//! - `InvalidChecksum`: CRC-32C mismatch on block payload or metadata
//!
//! ### Read-path Errors
//! - `LineTooLong`: Decoded line length exceeds the hard limit
//! - `BufferTooSmall`: A pool handed back a buffer below the requested capacity
//!
//! ### Codec Errors
//! - `Compression` / `Decompression`: Failures inside the compression codecs
//! - `Unsupported`: Encoding reserved in the wire enum but not implemented
//!
//! All fallible operations return `Result<T>`, aliased to `Result<T, Error>`,
//! so call sites propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic number: {0:#x}")]
    InvalidMagic(u32),

    #[error("Invalid chunk format version: {0}")]
    InvalidVersion(u8),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(u8),

    #[error("Checksum mismatch")]
    InvalidChecksum,

    #[error("Entry out of order")]
    OutOfOrder,

    #[error("Line too long: {length}, maximum {limit}")]
    LineTooLong { length: usize, limit: usize },

    #[error("Could not get a buffer of size {requested}, actual {actual}")]
    BufferTooSmall { requested: usize, actual: usize },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}
