//! Block Encoding Identifiers
//!
//! This module defines the `Encoding` enum - the compression algorithm applied
//! to block payloads inside a chunk.
//!
//! ## Wire Representation
//! The encoding is stored as a single byte in the chunk header (format v2).
//! Format v1 chunks predate the encoding byte and always imply gzip.
//!
//! ## Support Levels
//! - **None / Gzip / Lz4 / Zstd**: fully supported for read and write
//! - **Snappy**: reserved in the wire enum for compatibility, but the codec
//!   pools currently reject it with `Unsupported`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compression applied to chunk block payloads
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Encoding {
    None = 0,
    #[default]
    Gzip = 1,
    Snappy = 2,
    Lz4 = 3,
    Zstd = 4,
}

impl Encoding {
    /// The wire byte written into a v2 chunk header
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Encoding {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Encoding::None),
            1 => Ok(Encoding::Gzip),
            2 => Ok(Encoding::Snappy),
            3 => Ok(Encoding::Lz4),
            4 => Ok(Encoding::Zstd),
            _ => Err(crate::Error::InvalidEncoding(value)),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::None => write!(f, "none"),
            Encoding::Gzip => write!(f, "gzip"),
            Encoding::Snappy => write!(f, "snappy"),
            Encoding::Lz4 => write!(f, "lz4"),
            Encoding::Zstd => write!(f, "zstd"),
        }
    }
}
