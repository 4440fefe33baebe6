//! Blob compression.
//!
//! Blobs are DEFLATE-compressed (gzip framing). The uncompressed size is
//! recorded in the manifest, so decompression allocates exactly once and
//! can verify the decoded length.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Fixed allowance on top of the proportional bound for gzip framing.
const COMPRESSION_OVERHEAD: usize = 64;

/// Errors produced by a [`Compressor`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("decoded {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}

pub type CodecResult<T> = Result<T, CodecError>;

impl From<CodecError> for crate::SnapshotError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::CompressionFailed(msg) => Self::CompressionFailed(msg),
            other => Self::DecompressionFailed(other.to_string()),
        }
    }
}

/// How a blob is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobEncoding {
    Gzip,
    Raw,
}

impl BlobEncoding {
    /// File extension used for blobs of this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            BlobEncoding::Gzip => "gz",
            BlobEncoding::Raw => "raw",
        }
    }

    /// Lookup order when reading a blob back.
    pub const READ_ORDER: [BlobEncoding; 2] = [BlobEncoding::Gzip, BlobEncoding::Raw];
}

/// Upper bound on the compressed size of `len` input bytes.
pub fn max_compressed_len(len: usize) -> usize {
    len + len / 100 + COMPRESSION_OVERHEAD
}

/// A lossless byte-buffer codec.
pub trait Compressor: Send + Sync {
    /// Compress `data`. Output larger than [`max_compressed_len`] is a failure.
    fn compress(&self, data: &[u8]) -> CodecResult<Vec<u8>>;

    /// Decompress `data`, which must expand to exactly `original_size` bytes.
    fn decompress(&self, data: &[u8], original_size: u64) -> CodecResult<Vec<u8>>;
}

/// gzip compressor backed by `flate2`.
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    /// Create a compressor with a DEFLATE level from 0 to 9.
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let bound = max_compressed_len(data.len());
        let mut encoder = GzEncoder::new(Vec::with_capacity(bound), self.level);
        encoder
            .write_all(data)
            .map_err(|e| CodecError::CompressionFailed(e.to_string()))?;
        let out = encoder
            .finish()
            .map_err(|e| CodecError::CompressionFailed(e.to_string()))?;

        if out.len() > bound {
            return Err(CodecError::CompressionFailed(format!(
                "output of {} bytes exceeds bound of {bound}",
                out.len()
            )));
        }
        Ok(out)
    }

    fn decompress(&self, data: &[u8], original_size: u64) -> CodecResult<Vec<u8>> {
        let capacity = usize::try_from(original_size).map_err(|_| {
            CodecError::DecompressionFailed(format!("size {original_size} does not fit in memory"))
        })?;
        let mut out = Vec::with_capacity(capacity);
        // Read one byte past the expected size so oversized blobs are detected.
        GzDecoder::new(data)
            .take(original_size.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?;

        if out.len() as u64 != original_size {
            return Err(CodecError::SizeMismatch {
                expected: original_size,
                actual: out.len() as u64,
            });
        }
        Ok(out)
    }
}

/// Check a raw (uncompressed) blob against its recorded size.
pub fn check_raw(data: Vec<u8>, original_size: u64) -> CodecResult<Vec<u8>> {
    if data.len() as u64 != original_size {
        return Err(CodecError::SizeMismatch {
            expected: original_size,
            actual: data.len() as u64,
        });
    }
    Ok(data)
}
