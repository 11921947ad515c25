//! Error types for sleet-types

use thiserror::Error;

/// Result type for type-level parsing operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Value is not valid lowercase hex of at most 32 digits
    #[error("invalid hash value: {value:?}")]
    InvalidHash { value: String },

    /// Byte slice is not exactly 16 bytes long
    #[error("invalid hash length: expected 16 bytes, got {len}")]
    InvalidHashLength { len: usize },
}
