//! Error types for config decoding

use thiserror::Error;

/// Result type for config decoding
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A present key has a value the target field cannot hold
    #[error("invalid value for {key:?}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// A compound value has the wrong number of tokens
    #[error("expected {expected} tokens for {key:?}, got {actual}")]
    TokenCount {
        key: &'static str,
        expected: usize,
        actual: usize,
    },
}
