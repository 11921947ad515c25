//! HTTP client for the sleet delivery network.
//!
//! The pieces compose into the retrieval pipeline: discovery finds the
//! deployed build and mirror set for a (program, region) pair, the
//! encoding mapper translates content hashes to CDN hashes, the archive
//! index locates small files inside packed archives, and the
//! [`Resolver`] ties it together to turn a content hash into a decoded
//! byte stream.
//!
//! Every network operation takes a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and aborts
//! promptly when it fires.

pub mod archives;
pub mod error;
pub mod http;
pub mod resolver;
pub mod response_types;

pub use archives::{ArchiveIndex, ArchiveLocation};
pub use error::{Error, Result};
pub use http::{CdnClient, CdnClientBuilder, cdn_url};
pub use resolver::{FileStream, Resolver};
pub use response_types::{parse_cdns, parse_versions};
