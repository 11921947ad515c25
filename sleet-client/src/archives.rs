//! Concurrent archive-index construction.
//!
//! A CDN config lists the archives for a build; each archive has an
//! `.index` object mapping member CDN hashes to byte ranges. Building
//! the combined map means fetching every index, so the fetches fan out
//! over a bounded worker pool and the partial maps merge as they land.
//! Archive keyspaces are disjoint, so merge order does not matter.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sleet_types::{CdnHash, CdnInfo, ContentType};

use crate::error::{Error, Result};
use crate::http::{CdnClient, read_body};

/// Upper bound on concurrent index fetches.
pub const CONCURRENT_INDEX_FETCHES: usize = 20;

/// Where a file lives within the archive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLocation {
    /// CDN hash of the containing archive.
    pub archive: CdnHash,
    /// Byte offset of the member within the archive.
    pub offset: u32,
    /// Size of the member in bytes.
    pub size: u32,
}

/// Map from member CDN hash to its location in the archive set.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    map: HashMap<CdnHash, ArchiveLocation>,
}

type PartialMap = HashMap<CdnHash, ArchiveLocation>;

impl ArchiveIndex {
    /// Location of `hash` within the archive set, or `None` when the
    /// object is stored standalone.
    pub fn lookup(&self, hash: &CdnHash) -> Option<ArchiveLocation> {
        self.map.get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fetch and parse every archive's index, with at most
    /// [`CONCURRENT_INDEX_FETCHES`] fetches in flight.
    ///
    /// The first real error cancels the outstanding fetches and is
    /// returned; cancellation errors that are consequences of it are
    /// suppressed.
    pub async fn build(
        client: &CdnClient,
        cdn: &CdnInfo,
        archives: &[CdnHash],
        cancel: &CancellationToken,
    ) -> Result<Self> {
        if archives.is_empty() {
            return Ok(Self::default());
        }

        let worker_count = CONCURRENT_INDEX_FETCHES.min(archives.len());
        let child = cancel.child_token();
        let (tx, rx) = mpsc::channel::<CdnHash>(worker_count);
        let rx = Arc::new(Mutex::new(rx));

        let mut tasks: JoinSet<Result<PartialMap>> = JoinSet::new();

        // Feed the work queue.
        {
            let archives = archives.to_vec();
            let child = child.clone();
            tasks.spawn(async move {
                for hash in archives {
                    tokio::select! {
                        _ = child.cancelled() => return Err(Error::Canceled),
                        sent = tx.send(hash) => {
                            if sent.is_err() {
                                // All workers are gone; they carry the error.
                                break;
                            }
                        }
                    }
                }
                Ok(PartialMap::new())
            });
        }

        for _ in 0..worker_count {
            let rx = rx.clone();
            let child = child.clone();
            let client = client.clone();
            let cdn = cdn.clone();
            tasks.spawn(async move {
                let mut partial = PartialMap::new();
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = child.cancelled() => return Err(Error::Canceled),
                            next = rx.recv() => next,
                        }
                    };
                    let Some(archive) = next else { break };

                    let entries = fetch_index(&client, &cdn, &archive, &child).await?;
                    for entry in entries {
                        partial.insert(
                            entry.cdn_hash,
                            ArchiveLocation {
                                archive,
                                offset: entry.offset,
                                size: entry.size,
                            },
                        );
                    }
                }
                Ok(partial)
            });
        }

        let mut map = PartialMap::new();
        let mut first_error: Option<Error> = None;
        let mut canceled = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(partial)) => map.extend(partial),
                Ok(Err(Error::Canceled)) => canceled = true,
                Ok(Err(e)) => {
                    child.cancel();
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        warn!("additional archive index failure: {e}");
                    }
                }
                Err(join_error) => {
                    child.cancel();
                    if first_error.is_none() {
                        first_error = Some(Error::WorkerFailed(join_error.to_string()));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if canceled {
            return Err(Error::Canceled);
        }

        debug!(
            "built archive index: {} entries across {} archives",
            map.len(),
            archives.len()
        );
        Ok(Self { map })
    }
}

async fn fetch_index(
    client: &CdnClient,
    cdn: &CdnInfo,
    archive: &CdnHash,
    cancel: &CancellationToken,
) -> Result<Vec<sleet_parser::IndexEntry>> {
    let response = client
        .get(cdn, ContentType::Data, archive, ".index", cancel)
        .await?;
    let body = read_body(response, cancel).await?;
    Ok(sleet_parser::parse_index(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_on_empty_index() {
        let index = ArchiveIndex::default();
        assert!(index.is_empty());
        assert!(index.lookup(&CdnHash::new([1; 16])).is_none());
    }
}
