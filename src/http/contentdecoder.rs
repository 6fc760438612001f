//! Streaming response decompression.
//!
//! The `Content-Encoding` tag selects one codec from a closed set; the codec
//! is fed body chunks as they arrive and hands back whatever plaintext is
//! ready, so nothing is buffered beyond the codec's own window.

use crate::base::neterror::NetError;
use bytes::Bytes;
use flate2::{Decompress, FlushDecompress, Status};
use std::cell::RefCell;
use std::io::{self, Write};

/// Accept-Encoding advertised by default, most preferred first.
#[cfg(feature = "brotli")]
pub const ACCEPT_ENCODING: &str = "br, gzip, deflate";
#[cfg(not(feature = "brotli"))]
pub const ACCEPT_ENCODING: &str = "gzip, deflate";

/// Whether brotli support was compiled in.
pub const BROTLI: bool = cfg!(feature = "brotli");

/// Output space reserved before each zlib step.
const ZLIB_OUTPUT_CHUNK: usize = 32 * 1024;

/// Brotli's internal ring buffer.
#[cfg(feature = "brotli")]
const BROTLI_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Deflate,
    #[cfg(feature = "brotli")]
    Brotli,
    /// Passthrough. Also used for tags we cannot decode.
    Identity,
}

impl ContentEncoding {
    /// Select a codec from a `Content-Encoding` header value.
    ///
    /// The value is trimmed and lower-cased, then matched exactly. `br`
    /// without brotli support maps to `Identity`, leaving the body encoded.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return ContentEncoding::Identity;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            #[cfg(feature = "brotli")]
            "br" => ContentEncoding::Brotli,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            #[cfg(feature = "brotli")]
            ContentEncoding::Brotli => "br",
            ContentEncoding::Identity => "identity",
        }
    }

    /// A fresh decoder, or `None` for passthrough.
    pub fn decoder(self) -> Option<ContentDecoder> {
        let codec = match self {
            ContentEncoding::Gzip => {
                Codec::Gzip(flate2::write::MultiGzDecoder::new(OutputSink::default()))
            }
            ContentEncoding::Deflate => Codec::Deflate(ZlibStream::new()),
            #[cfg(feature = "brotli")]
            ContentEncoding::Brotli => Codec::Brotli(Box::new(brotli::DecompressorWriter::new(
                OutputSink::default(),
                BROTLI_BUFFER_SIZE,
            ))),
            ContentEncoding::Identity => return None,
        };
        Some(ContentDecoder {
            encoding: self,
            codec,
            consumed: 0,
        })
    }
}

/// Plaintext produced by a codec, drained after every chunk.
#[derive(Debug, Default)]
struct OutputSink(RefCell<Vec<u8>>);

impl OutputSink {
    fn drain(&self) -> Bytes {
        Bytes::from(self.0.take())
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.get_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A zlib stream that must reach its end marker.
///
/// `write::ZlibDecoder` flushes on finish without checking that the stream
/// ended, so a body cut short would decode silently.
struct ZlibStream {
    inner: Decompress,
    out: Vec<u8>,
    ended: bool,
}

impl ZlibStream {
    fn new() -> Self {
        Self {
            inner: Decompress::new(true),
            out: Vec::new(),
            ended: false,
        }
    }

    fn feed(&mut self, mut input: &[u8]) -> io::Result<()> {
        loop {
            if self.ended {
                if input.is_empty() {
                    return Ok(());
                }
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "trailing data after end of stream",
                ));
            }
            if self.out.capacity() - self.out.len() < ZLIB_OUTPUT_CHUNK {
                self.out.reserve(ZLIB_OUTPUT_CHUNK);
            }

            let (before_in, before_out) = (self.inner.total_in(), self.inner.total_out());
            let status = self
                .inner
                .decompress_vec(input, &mut self.out, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let read = (self.inner.total_in() - before_in) as usize;
            let wrote = self.inner.total_out() - before_out;
            input = &input[read..];

            if status == Status::StreamEnd {
                self.ended = true;
                continue;
            }
            if read == 0 && wrote == 0 {
                if input.is_empty() {
                    return Ok(());
                }
                return Err(io::Error::new(io::ErrorKind::InvalidData, "zlib stream stalled"));
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        // Drain anything still held back by the output window.
        self.feed(&[])?;
        if self.ended {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected end of file",
            ))
        }
    }

    fn drain(&mut self) -> Bytes {
        Bytes::from(std::mem::take(&mut self.out))
    }
}

enum Codec {
    Gzip(flate2::write::MultiGzDecoder<OutputSink>),
    Deflate(ZlibStream),
    #[cfg(feature = "brotli")]
    Brotli(Box<brotli::DecompressorWriter<OutputSink>>),
}

impl Codec {
    fn write_all(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self {
            Codec::Gzip(d) => d.write_all(chunk),
            Codec::Deflate(d) => d.feed(chunk),
            #[cfg(feature = "brotli")]
            Codec::Brotli(d) => d.write_all(chunk),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        match self {
            Codec::Gzip(d) => d.try_finish(),
            Codec::Deflate(d) => d.finish(),
            #[cfg(feature = "brotli")]
            Codec::Brotli(d) => d.close(),
        }
    }

    fn drain(&mut self) -> Bytes {
        match self {
            Codec::Gzip(d) => d.get_ref().drain(),
            Codec::Deflate(d) => d.drain(),
            #[cfg(feature = "brotli")]
            Codec::Brotli(d) => d.get_ref().drain(),
        }
    }
}

/// Incremental decoder for one response body.
pub struct ContentDecoder {
    encoding: ContentEncoding,
    codec: Codec,
    consumed: u64,
}

impl std::fmt::Debug for ContentDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentDecoder")
            .field("encoding", &self.encoding)
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl ContentDecoder {
    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    /// Feed one compressed chunk and return the plaintext it produced.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Bytes, NetError> {
        self.consumed += chunk.len() as u64;
        self.codec
            .write_all(chunk)
            .map_err(|e| NetError::decoding_failed(self.encoding.as_str(), e))?;
        Ok(self.codec.drain())
    }

    /// Signal end of input and return any trailing plaintext.
    ///
    /// An empty or truncated stream is an error: a body that declares an
    /// encoding must carry at least a complete header and trailer.
    pub fn finish(mut self) -> Result<Bytes, NetError> {
        if self.consumed == 0 {
            return Err(NetError::decoding_failed(
                self.encoding.as_str(),
                "unexpected end of file",
            ));
        }
        self.codec
            .finish()
            .map_err(|e| NetError::decoding_failed(self.encoding.as_str(), e))?;
        Ok(self.codec.drain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;

    const PLAIN: &[u8] = b"This is compressed response!";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn decode_in_chunks(encoding: ContentEncoding, data: &[u8], chunk: usize) -> Vec<u8> {
        let mut decoder = encoding.decoder().unwrap();
        let mut out = Vec::new();
        for piece in data.chunks(chunk) {
            out.extend_from_slice(&decoder.decode(piece).unwrap());
        }
        out.extend_from_slice(&decoder.finish().unwrap());
        out
    }

    #[test]
    fn test_header_selection() {
        assert_eq!(ContentEncoding::from_header(Some("gzip")), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_header(Some("x-gzip")), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_header(Some("GZIP")), ContentEncoding::Gzip);
        assert_eq!(
            ContentEncoding::from_header(Some("deflate")),
            ContentEncoding::Deflate
        );
        assert_eq!(
            ContentEncoding::from_header(Some("gzip, br")),
            ContentEncoding::Identity
        );
        assert_eq!(ContentEncoding::from_header(None), ContentEncoding::Identity);
        assert!(ContentEncoding::Identity.decoder().is_none());
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn test_brotli_selected_and_advertised() {
        assert_eq!(ContentEncoding::from_header(Some("br")), ContentEncoding::Brotli);
        assert!(BROTLI);
        assert_eq!(ACCEPT_ENCODING, "br, gzip, deflate");
    }

    #[cfg(not(feature = "brotli"))]
    #[test]
    fn test_brotli_passthrough_without_support() {
        assert_eq!(ContentEncoding::from_header(Some("br")), ContentEncoding::Identity);
        assert_eq!(ACCEPT_ENCODING, "gzip, deflate");
    }

    #[test]
    fn test_gzip_streaming() {
        let compressed = gzip(PLAIN);
        assert_eq!(decode_in_chunks(ContentEncoding::Gzip, &compressed, 3), PLAIN);
        assert_eq!(
            decode_in_chunks(ContentEncoding::Gzip, &compressed, compressed.len()),
            PLAIN
        );
    }

    #[test]
    fn test_deflate_streaming() {
        let compressed = zlib(PLAIN);
        assert_eq!(decode_in_chunks(ContentEncoding::Deflate, &compressed, 5), PLAIN);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn test_brotli_streaming() {
        let mut compressed = Vec::new();
        {
            let mut enc = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            enc.write_all(PLAIN).unwrap();
        }
        assert_eq!(decode_in_chunks(ContentEncoding::Brotli, &compressed, 4), PLAIN);
    }

    #[test]
    fn test_empty_gzip_body_fails() {
        let decoder = ContentEncoding::Gzip.decoder().unwrap();
        let err = decoder.finish().unwrap_err();
        assert!(matches!(
            err,
            NetError::ContentDecodingFailed {
                encoding: "gzip",
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_gzip_fails() {
        let mut decoder = ContentEncoding::Gzip.decoder().unwrap();
        let failed = match decoder.decode(b"definitely not gzip data") {
            Ok(_) => decoder.finish().is_err(),
            Err(_) => true,
        };
        assert!(failed);
    }

    #[test]
    fn test_truncated_gzip_fails() {
        let compressed = gzip(PLAIN);
        let mut decoder = ContentEncoding::Gzip.decoder().unwrap();
        decoder.decode(&compressed[..compressed.len() - 4]).unwrap();
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_truncated_deflate_fails() {
        let compressed = zlib(&PLAIN.repeat(3));
        let mut decoder = ContentEncoding::Deflate.decoder().unwrap();
        decoder.decode(&compressed[..compressed.len() / 2]).unwrap();
        let err = decoder.finish().unwrap_err();
        assert!(matches!(
            err,
            NetError::ContentDecodingFailed {
                encoding: "deflate",
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_deflate_fails() {
        let mut decoder = ContentEncoding::Deflate.decoder().unwrap();
        assert!(decoder.decode(b"definitely not zlib data").is_err());
    }

    #[test]
    fn test_deflate_trailing_data_fails() {
        let mut compressed = zlib(PLAIN);
        compressed.extend_from_slice(b"junk");
        let mut decoder = ContentEncoding::Deflate.decoder().unwrap();
        assert!(decoder.decode(&compressed).is_err());
    }

    #[test]
    fn test_deflate_large_output() {
        let plain = vec![b'a'; 5 * ZLIB_OUTPUT_CHUNK + 17];
        let compressed = zlib(&plain);
        assert_eq!(decode_in_chunks(ContentEncoding::Deflate, &compressed, 7), plain);
        assert_eq!(
            decode_in_chunks(ContentEncoding::Deflate, &compressed, compressed.len()),
            plain
        );
    }

    #[test]
    fn test_multi_member_gzip() {
        let mut body = gzip(b"hello ");
        body.extend_from_slice(&gzip(b"world"));
        assert_eq!(decode_in_chunks(ContentEncoding::Gzip, &body, body.len()), b"hello world");
        assert_eq!(decode_in_chunks(ContentEncoding::Gzip, &body, 3), b"hello world");
    }
}
