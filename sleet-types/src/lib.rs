//! Core types shared by the sleet asset delivery client crates.
//!
//! The distribution network addresses everything by MD5: a *content hash*
//! identifies the original bytes of a file, a *CDN hash* identifies the
//! container-framed blob as stored on a mirror. The two are kept as
//! distinct types so they cannot be mixed up; translating between them is
//! the job of the encoding table.

pub mod error;
pub mod hash;
pub mod info;
pub mod tags;

pub use error::{Error, Result};
pub use hash::{CdnHash, ContentHash};
pub use info::{
    BuildConfig, CdnConfig, CdnInfo, EncodingPointer, EncodingSizes, FilenameMapper, VersionInfo,
};
pub use tags::{ContentType, ProgramCode, Region};
