//! High-level resolution: content hash (or path) to decoded bytes.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Response;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use sleet_parser::{EncodingMapper, FilenameTree};
use sleet_types::{
    BuildConfig, CdnConfig, CdnInfo, ContentHash, ContentType, FilenameMapper, VersionInfo,
};

use crate::archives::ArchiveIndex;
use crate::error::{Error, Result};
use crate::http::CdnClient;

/// A decoded file: the container decoder running over the HTTP body.
///
/// Dropping the stream drops the underlying connection.
pub type FileStream = blte::Decoder<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>;

/// A fully assembled client for one (program, region) at one build: all
/// the artifacts needed to turn a content hash into file bytes.
///
/// Artifacts are shared behind `Arc`s, so a resolver snapshot remains
/// valid even after the datastore that issued it moves to a newer build.
#[derive(Clone, Debug)]
pub struct Resolver {
    pub client: CdnClient,

    pub cdn: Arc<CdnInfo>,
    pub version: Arc<VersionInfo>,

    pub build_config: Arc<BuildConfig>,
    pub cdn_config: Arc<CdnConfig>,

    pub encoding: Arc<EncodingMapper>,
    pub archives: Arc<ArchiveIndex>,
    /// Present once the root manifest has been parsed.
    pub filenames: Option<Arc<FilenameTree>>,
}

impl Resolver {
    /// Fetch a file by its content hash and return the decoded stream.
    ///
    /// The content hash is translated through the encoding table; when
    /// the resulting CDN object lives inside an archive the fetch is a
    /// byte range against the archive, otherwise a whole-object fetch.
    pub async fn resolve(
        &self,
        content_hash: ContentHash,
        cancel: &CancellationToken,
    ) -> Result<FileStream> {
        let cdn_hash = self.encoding.lookup(&content_hash)?;

        let response = match self.archives.lookup(&cdn_hash) {
            Some(location) => {
                trace!(
                    "{content_hash} -> {cdn_hash} in archive {} at {}+{}",
                    location.archive, location.offset, location.size,
                );
                self.client
                    .get_range(
                        &self.cdn,
                        ContentType::Data,
                        &location.archive,
                        location.offset,
                        location.size,
                        cancel,
                    )
                    .await?
            }
            None => {
                trace!("{content_hash} -> {cdn_hash} standalone");
                self.client
                    .get(&self.cdn, ContentType::Data, &cdn_hash, "", cancel)
                    .await?
            }
        };

        Ok(decode_stream(response))
    }

    /// Fetch a file by path, using the installed filename mapper.
    pub async fn resolve_path(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<FileStream> {
        let mapper = self.filenames.as_ref().ok_or(Error::NoFilenameMapper)?;
        let content_hash = mapper
            .content_hash(path)
            .ok_or_else(|| Error::NoSuchFile {
                path: path.to_string(),
            })?;
        self.resolve(content_hash, cancel).await
    }
}

/// Wrap an HTTP response body in the container decoder.
pub fn decode_stream(response: Response) -> FileStream {
    let body = response
        .bytes_stream()
        .map_err(io::Error::other)
        .boxed();
    blte::Decoder::new(StreamReader::new(body))
}
