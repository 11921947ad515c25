//! Error types for BLTE decoding

use thiserror::Error;

/// Result type for BLTE operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream does not start with the BLTE magic
    #[error("invalid magic: expected \"BLTE\", got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Declared header size does not match the chunk count
    #[error("invalid header size: {0}")]
    InvalidHeaderSize(u32),

    /// Chunk body is shorter than its declared compressed size
    #[error("truncated chunk {chunk}")]
    TruncatedChunk { chunk: usize },

    /// Chunk uses a compression mode the decoder cannot handle
    #[error("unsupported compression mode: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Chunk body MD5 does not match the header's declared digest
    #[error("checksum mismatch in chunk {chunk}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        chunk: usize,
        expected: String,
        actual: String,
    },

    /// Chunk decoded to a different size than the header declared
    #[error("chunk {chunk} decoded to {actual} bytes, header declared {expected}")]
    SizeMismatch {
        chunk: usize,
        expected: u32,
        actual: usize,
    },

    /// Zlib inflation failed
    #[error("decompression failed in chunk {chunk}: {reason}")]
    DecompressionFailed { chunk: usize, reason: String },
}
