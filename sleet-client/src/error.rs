//! Error types for the client

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an unexpected status code
    #[error("server returned \"{status}\" for {url}; wanted \"{wanted}\"")]
    BadStatus {
        status: StatusCode,
        wanted: StatusCode,
        url: String,
    },

    /// Discovery table could not be parsed
    #[error("discovery table: {0}")]
    Table(#[from] sleet_psv::Error),

    /// A discovery row is missing or malformed
    #[error("invalid {field:?} field: {reason}")]
    InvalidRow { field: String, reason: String },

    /// Encoding table, archive index or filename tree failure
    #[error(transparent)]
    Parser(#[from] sleet_parser::Error),

    /// Neither the `cdns` nor `versions` table has a row for the region
    #[error("region {region:?} is unknown for this product")]
    UnknownRegion { region: String },

    /// A CDN row listed no mirror hosts
    #[error("CDN entry {name:?} has an empty host list")]
    EmptyHostList { name: String },

    /// Path resolution requested but no filename mapper is installed
    #[error("no filename mapper registered")]
    NoFilenameMapper,

    /// Filename mapper has no entry for the path
    #[error("no such file: {path:?}")]
    NoSuchFile { path: String },

    /// Operation aborted by its cancellation token
    #[error("operation canceled")]
    Canceled,

    /// An archive fan-out worker died
    #[error("archive index worker failed: {0}")]
    WorkerFailed(String),
}

impl Error {
    /// Whether this error is a cancellation, either direct or wrapped.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    pub(crate) fn invalid_row(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
