//! Error types for the datastore

use sleet_types::{ProgramCode, Region};
use thiserror::Error;

/// Result type for datastore operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Fetch or discovery failure
    #[error(transparent)]
    Client(#[from] sleet_client::Error),

    /// Config body could not be parsed
    #[error("config: {0}")]
    Config(#[from] sleet_config::Error),

    /// Encoding table, archive index or filename tree failure
    #[error(transparent)]
    Parser(#[from] sleet_parser::Error),

    /// Container decoding failure
    #[error("container: {0}")]
    Container(#[from] blte::Error),

    /// A required artifact is not cached for the pair
    #[error("{what} missing for {program:?}/{region:?}")]
    Missing {
        what: &'static str,
        program: ProgramCode,
        region: Region,
    },
}

impl Error {
    /// Whether the update was aborted by its cancellation token.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Client(e) if e.is_canceled())
    }
}
