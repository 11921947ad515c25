//! Parsers for the binary formats the client consumes: the encoding
//! table (content hash → CDN hash), archive indices (CDN hash → byte
//! range within an archive), and the filename tree built from a root
//! manifest.

pub mod archive;
pub mod encoding;
pub mod error;
pub mod fstree;
pub mod testutil;

pub use archive::{IndexEntry, parse_index};
pub use encoding::EncodingMapper;
pub use error::{Error, Result};
pub use fstree::{FileList, FileMeta, FilenameTree, RootParser};
