//! Error types for the binary parsers

use thiserror::Error;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Encoding table does not start with the `EN` magic
    #[error("encoding table: bad magic")]
    BadMagic,

    /// Encoding table declares a hash size other than 16 bytes
    #[error("encoding table: bad hash sizes in header ({a:#04x}, {b:#04x})")]
    BadHashSize { a: u8, b: u8 },

    /// Input ended before a declared structure was complete
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A key page's MD5 does not match the page index
    #[error("encoding table: page {page} checksum mismatch: expected {expected}, got {actual}")]
    PageChecksumMismatch {
        page: usize,
        expected: String,
        actual: String,
    },

    /// A page entry's declared CDN-hash count overruns the page
    #[error("encoding table: truncated entry in page {page}")]
    TruncatedPageEntry { page: usize },

    /// Content hash is not present in the encoding table
    #[error("unknown content hash")]
    UnknownContentHash,

    /// Content hash maps to more than one CDN hash
    #[error("content hash maps to multiple CDN hashes")]
    AmbiguousContentHash,

    /// Archive index entry whose byte range overflows u32
    #[error("archive index: offset {offset} + size {size} overflows")]
    IndexEntryOverflow { offset: u32, size: u32 },

    /// A file and a directory share a (case-folded) name
    #[error("file and directory have clashing names: {path:?}")]
    FileDirClash { path: String },

    /// Two files share a (case-folded) name
    #[error("duplicate file name: {path:?}")]
    DuplicateEntry { path: String },

    /// Path names a file or directory that does not exist
    #[error("no such file or directory: {path:?}")]
    NotFound { path: String },

    /// Path descends into something that is not a directory
    #[error("not a directory: {path:?}")]
    NotADirectory { path: String },

    /// A manifest entry has an empty path
    #[error("empty file name in manifest")]
    EmptyFilename,
}
