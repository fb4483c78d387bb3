//! Decompression of response bodies.
//!
//! The API may return compressed payloads without a matching
//! `Content-Encoding` header, so the frame is sniffed from magic bytes.

use std::io::Read;

use eurostat_error::{EurostatError, Result};
use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
/// 0xFD2FB528 in little endian.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn detect(buf: &[u8]) -> Self {
        if buf.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else if buf.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

/// Decompress the buffer if it's gzip or zstd framed, otherwise return a copy
/// of it unchanged.
pub fn decompress_if_framed(buf: &[u8]) -> Result<Vec<u8>> {
    match Compression::detect(buf) {
        Compression::None => Ok(buf.to_vec()),
        Compression::Gzip => {
            let mut out = Vec::with_capacity(buf.len() * 4);
            MultiGzDecoder::new(buf)
                .read_to_end(&mut out)
                .map_err(|e| EurostatError::format("Invalid gzip data").with_field("error", e))?;
            Ok(out)
        }
        Compression::Zstd => zstd::stream::decode_all(buf)
            .map_err(|e| EurostatError::format("Invalid zstd data").with_field("error", e)),
    }
}
