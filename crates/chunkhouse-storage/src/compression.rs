//! Compression Reader/Writer Pools
//!
//! This module dispatches block payload compression to the codec matching the
//! chunk's `Encoding`. One [`ReaderPool`]/[`WriterPool`] pair exists per
//! encoding; the chunk resolves its pair once at construction and hands it to
//! every cut and every block iterator.
//!
//! ## Supported Codecs
//!
//! - `None`: payload passes through untouched
//! - `Gzip`: flate2 (the v1 legacy encoding, always readable)
//! - `Lz4`: lz4_flex frame format
//! - `Zstd`: zstd at its default level
//! - `Snappy`: reserved in the wire enum; resolving a codec for it returns
//!   `Unsupported`
//!
//! ## Codec Instances
//!
//! None of the codec crates expose cheap `reset(new_source)` semantics, so the
//! pools construct an instance per serialize/iterate call and discard it
//! afterwards. The buffers around the codecs (scratch, line, read buffers) are
//! the pooled part; see `pool.rs`.

use chunkhouse_core::{Encoding, Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{self, BufReader, Read, Write};

/// Resolves decompressing readers for one encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderPool {
    encoding: Encoding,
}

impl ReaderPool {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Wrap a compressed source in a decompressing reader
    pub fn reader<R: Read>(&self, src: R) -> Result<CompressionReader<R>> {
        match self.encoding {
            Encoding::None => Ok(CompressionReader::Plain(src)),
            Encoding::Gzip => Ok(CompressionReader::Gzip(Box::new(GzDecoder::new(src)))),
            Encoding::Lz4 => Ok(CompressionReader::Lz4(Box::new(FrameDecoder::new(src)))),
            Encoding::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(src)
                    .map_err(|e| Error::Decompression(e.to_string()))?;
                Ok(CompressionReader::Zstd(Box::new(decoder)))
            }
            Encoding::Snappy => Err(Error::Unsupported(
                "Snappy compression not yet implemented".to_string(),
            )),
        }
    }
}

/// Resolves compressing writers for one encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterPool {
    encoding: Encoding,
}

impl WriterPool {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Wrap a sink in a compressing writer; call `finish` to flush the frame
    pub fn writer<W: Write>(&self, out: W) -> Result<CompressionWriter<W>> {
        match self.encoding {
            Encoding::None => Ok(CompressionWriter::Plain(out)),
            Encoding::Gzip => Ok(CompressionWriter::Gzip(Box::new(GzEncoder::new(
                out,
                flate2::Compression::default(),
            )))),
            Encoding::Lz4 => Ok(CompressionWriter::Lz4(Box::new(FrameEncoder::new(out)))),
            Encoding::Zstd => {
                let encoder =
                    zstd::stream::write::Encoder::new(out, zstd::DEFAULT_COMPRESSION_LEVEL)
                        .map_err(|e| Error::Compression(e.to_string()))?;
                Ok(CompressionWriter::Zstd(Box::new(encoder)))
            }
            Encoding::Snappy => Err(Error::Unsupported(
                "Snappy compression not yet implemented".to_string(),
            )),
        }
    }
}

/// Decompressing reader over a block payload
pub enum CompressionReader<R: Read> {
    Plain(R),
    Gzip(Box<GzDecoder<R>>),
    Lz4(Box<FrameDecoder<R>>),
    Zstd(Box<zstd::stream::read::Decoder<'static, BufReader<R>>>),
}

impl<R: Read> Read for CompressionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CompressionReader::Plain(r) => r.read(buf),
            CompressionReader::Gzip(r) => r.read(buf),
            CompressionReader::Lz4(r) => r.read(buf),
            CompressionReader::Zstd(r) => r.read(buf),
        }
    }
}

/// Compressing writer producing a block payload
pub enum CompressionWriter<W: Write> {
    Plain(W),
    Gzip(Box<GzEncoder<W>>),
    Lz4(Box<FrameEncoder<W>>),
    Zstd(Box<zstd::stream::write::Encoder<'static, W>>),
}

impl<W: Write> CompressionWriter<W> {
    /// Flush any pending compressed data and hand back the sink
    pub fn finish(self) -> Result<W> {
        match self {
            CompressionWriter::Plain(w) => Ok(w),
            CompressionWriter::Gzip(e) => {
                e.finish().map_err(|e| Error::Compression(e.to_string()))
            }
            CompressionWriter::Lz4(e) => {
                e.finish().map_err(|e| Error::Compression(e.to_string()))
            }
            CompressionWriter::Zstd(e) => {
                e.finish().map_err(|e| Error::Compression(e.to_string()))
            }
        }
    }
}

impl<W: Write> Write for CompressionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressionWriter::Plain(w) => w.write(buf),
            CompressionWriter::Gzip(w) => w.write(buf),
            CompressionWriter::Lz4(w) => w.write(buf),
            CompressionWriter::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressionWriter::Plain(w) => w.flush(),
            CompressionWriter::Gzip(w) => w.flush(),
            CompressionWriter::Lz4(w) => w.flush(),
            CompressionWriter::Zstd(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(encoding: Encoding, payload: &[u8]) -> Vec<u8> {
        let writers = WriterPool::new(encoding);
        let mut w = writers.writer(Vec::new()).unwrap();
        w.write_all(payload).unwrap();
        let compressed = w.finish().unwrap();

        let readers = ReaderPool::new(encoding);
        let mut r = readers.reader(compressed.as_slice()).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    // ---------------------------------------------------------------
    // Round-trips per codec
    // ---------------------------------------------------------------

    #[test]
    fn test_roundtrip_none() {
        let data = b"plain payload".to_vec();
        assert_eq!(roundtrip(Encoding::None, &data), data);
    }

    #[test]
    fn test_roundtrip_gzip() {
        let data = b"gzip payload gzip payload gzip payload".to_vec();
        assert_eq!(roundtrip(Encoding::Gzip, &data), data);
    }

    #[test]
    fn test_roundtrip_lz4() {
        let data = vec![b'x'; 10_000];
        assert_eq!(roundtrip(Encoding::Lz4, &data), data);
    }

    #[test]
    fn test_roundtrip_zstd() {
        let data: Vec<u8> = (0..255u8).cycle().take(5_000).collect();
        assert_eq!(roundtrip(Encoding::Zstd, &data), data);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        for encoding in [Encoding::None, Encoding::Gzip, Encoding::Lz4, Encoding::Zstd] {
            assert!(roundtrip(encoding, b"").is_empty(), "{encoding}");
        }
    }

    // ---------------------------------------------------------------
    // Compression actually shrinks compressible data
    // ---------------------------------------------------------------

    #[test]
    fn test_compressible_data_shrinks() {
        let data = vec![b'z'; 100_000];
        for encoding in [Encoding::Gzip, Encoding::Lz4, Encoding::Zstd] {
            let writers = WriterPool::new(encoding);
            let mut w = writers.writer(Vec::new()).unwrap();
            w.write_all(&data).unwrap();
            let compressed = w.finish().unwrap();
            assert!(
                compressed.len() < data.len() / 2,
                "{encoding}: {} bytes",
                compressed.len()
            );
        }
    }

    // ---------------------------------------------------------------
    // Snappy is reserved but unsupported
    // ---------------------------------------------------------------

    #[test]
    fn test_snappy_writer_unsupported() {
        let writers = WriterPool::new(Encoding::Snappy);
        assert!(matches!(
            writers.writer(Vec::new()),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_snappy_reader_unsupported() {
        let readers = ReaderPool::new(Encoding::Snappy);
        assert!(matches!(
            readers.reader(&[][..]),
            Err(Error::Unsupported(_))
        ));
    }

    // ---------------------------------------------------------------
    // Corrupt input surfaces as a read error
    // ---------------------------------------------------------------

    #[test]
    fn test_corrupt_gzip_stream_errors() {
        let readers = ReaderPool::new(Encoding::Gzip);
        let mut r = readers.reader(&b"not a gzip stream"[..]).unwrap();
        let mut out = Vec::new();
        assert!(r.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_pool_reports_encoding() {
        assert_eq!(ReaderPool::new(Encoding::Lz4).encoding(), Encoding::Lz4);
        assert_eq!(WriterPool::new(Encoding::Zstd).encoding(), Encoding::Zstd);
    }
}
