//! Payload compression for request and response bodies.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::OtsError;

/// Pre-allocate at most this many inflated bytes per compressed byte.
const MAX_PREALLOC_RATIO: usize = 16;

/// Compression type named in `x-ots-*-compress-type` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflate,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::Deflate => "deflate",
        }
    }

    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deflate" => Some(Compression::Deflate),
            _ => None,
        }
    }

    pub fn compress(self, raw: &[u8]) -> Result<Vec<u8>, OtsError> {
        match self {
            Compression::Deflate => {
                let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(raw)
                    .and_then(|_| enc.finish())
                    .map_err(|e| OtsError::protocol(format!("deflate request body: {}", e)))
            }
        }
    }

    /// Inflate `data`; the result must be exactly `expected_size` bytes.
    /// `expected_size` comes from the peer: it bounds how much is inflated
    /// but is never trusted for allocation.
    pub fn decompress(self, data: &[u8], expected_size: usize) -> Result<Vec<u8>, OtsError> {
        match self {
            Compression::Deflate => {
                let capacity = expected_size.min(data.len().saturating_mul(MAX_PREALLOC_RATIO));
                let limit = u64::try_from(expected_size)
                    .unwrap_or(u64::MAX)
                    .saturating_add(1);
                let mut out = Vec::with_capacity(capacity);
                ZlibDecoder::new(data)
                    .take(limit)
                    .read_to_end(&mut out)
                    .map_err(|e| OtsError::protocol(format!("inflate response body: {}", e)))?;
                if out.len() != expected_size {
                    return Err(OtsError::protocol(format!(
                        "inflated body is {} bytes, header declared {}",
                        out.len(),
                        expected_size
                    )));
                }
                Ok(out)
            }
        }
    }
}
