//! The datastore proper.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sleet_client::{ArchiveIndex, CdnClient, Resolver, http};
use sleet_parser::{EncodingMapper, FilenameTree, RootParser};
use sleet_types::{
    BuildConfig, CdnConfig, CdnHash, CdnInfo, ContentType, ProgramCode, Region, VersionInfo,
};

use crate::error::{Error, Result};

/// One tracked (region, program) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    pub region: Region,
    pub program: ProgramCode,
}

/// Cache occupancy counters, for diagnostics and monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub tracked: usize,
    pub build_configs: usize,
    pub cdn_configs: usize,
    pub encoding_mappers: usize,
    pub filename_mappers: usize,
    pub archive_mappers: usize,
}

/// Everything the datastore caches, guarded by one reader-writer lock.
///
/// Artifact values are `Arc`s: snapshots clone the handles, so evicting
/// a map entry never invalidates a snapshot issued earlier.
#[derive(Default)]
struct Inner {
    tracking: Vec<Tracked>,

    cdn_infos: HashMap<ProgramCode, HashMap<Region, Arc<CdnInfo>>>,
    version_infos: HashMap<ProgramCode, HashMap<Region, Arc<VersionInfo>>>,

    // Keyed on their own CDN hashes.
    build_configs: HashMap<CdnHash, Arc<BuildConfig>>,
    cdn_configs: HashMap<CdnHash, Arc<CdnConfig>>,

    // Keyed on the build config CDN hash.
    encoding_mappers: HashMap<CdnHash, Arc<EncodingMapper>>,
    filename_mappers: HashMap<CdnHash, Arc<FilenameTree>>,

    // Keyed on the CDN config CDN hash.
    archive_mappers: HashMap<CdnHash, Arc<ArchiveIndex>>,
}

/// Concurrent fleet tracker.
///
/// `update` refreshes every tracked pair; `client` hands out a
/// read-consistent [`Resolver`] for one pair. The lock is only ever held
/// for map access, never across I/O.
pub struct Datastore {
    client: CdnClient,
    root_parser: Arc<dyn RootParser>,
    inner: RwLock<Inner>,
}

impl Datastore {
    pub fn new(client: CdnClient, root_parser: Arc<dyn RootParser>) -> Self {
        Self {
            client,
            root_parser,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Add a pair to the tracking set. Idempotent.
    pub fn track(&self, region: Region, program: ProgramCode) {
        let tracked = Tracked { region, program };
        let mut inner = self.inner.write();
        if !inner.tracking.contains(&tracked) {
            inner.tracking.push(tracked);
        }
    }

    /// The tracking set, in insertion order.
    pub fn tracking(&self) -> Vec<Tracked> {
        self.inner.read().tracking.clone()
    }

    /// Current cache occupancy.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        StoreStats {
            tracked: inner.tracking.len(),
            build_configs: inner.build_configs.len(),
            cdn_configs: inner.cdn_configs.len(),
            encoding_mappers: inner.encoding_mappers.len(),
            filename_mappers: inner.filename_mappers.len(),
            archive_mappers: inner.archive_mappers.len(),
        }
    }

    /// Compose a read-consistent snapshot for one pair.
    ///
    /// Fails with [`Error::Missing`] until the pair has been updated
    /// successfully at least once.
    pub fn client(&self, region: &Region, program: &ProgramCode) -> Result<Resolver> {
        let missing = |what: &'static str| Error::Missing {
            what,
            program: program.clone(),
            region: region.clone(),
        };

        let inner = self.inner.read();

        let cdn = inner
            .cdn_infos
            .get(program)
            .and_then(|m| m.get(region))
            .ok_or_else(|| missing("CDNInfo"))?
            .clone();
        let version = inner
            .version_infos
            .get(program)
            .and_then(|m| m.get(region))
            .ok_or_else(|| missing("VersionInfo"))?
            .clone();

        let build_config = inner
            .build_configs
            .get(&version.build_config)
            .ok_or_else(|| missing("BuildConfig"))?
            .clone();
        let cdn_config = inner
            .cdn_configs
            .get(&version.cdn_config)
            .ok_or_else(|| missing("CDNConfig"))?
            .clone();

        let encoding = inner
            .encoding_mappers
            .get(&version.build_config)
            .ok_or_else(|| missing("EncodingMapper"))?
            .clone();
        let filenames = inner
            .filename_mappers
            .get(&version.build_config)
            .ok_or_else(|| missing("FilenameMapper"))?
            .clone();
        let archives = inner
            .archive_mappers
            .get(&version.cdn_config)
            .ok_or_else(|| missing("ArchiveMapper"))?
            .clone();

        Ok(Resolver {
            client: self.client.clone(),
            cdn,
            version,
            build_config,
            cdn_config,
            encoding,
            archives,
            filenames: Some(filenames),
        })
    }

    /// Run one update pass over every tracked pair, then evict artifacts
    /// no longer reachable from any pair's current version.
    ///
    /// A failure for one pair is logged and does not stop the others;
    /// the last error, if any, is returned. Cancellation aborts the
    /// whole pass.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<()> {
        let tracking = self.tracking();

        let mut last_error = None;
        for tracked in tracking {
            match self
                .update_pair(&tracked.region, &tracked.program, cancel)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => {
                    error!(
                        "error updating {:?}/{:?}: {e}",
                        tracked.program, tracked.region
                    );
                    last_error = Some(e);
                }
            }
        }

        self.evict();

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Update a single pair.
    async fn update_pair(
        &self,
        region: &Region,
        program: &ProgramCode,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!("updating {program:?}/{region:?}");

        let (cdn, version) = self.client.info(program, region, cancel).await?;

        let (cached_build, cached_cdn) = {
            let inner = self.inner.read();

            if let Some(old) = inner.version_infos.get(program).and_then(|m| m.get(region)) {
                if old.versions_name != version.versions_name {
                    info!(
                        "{program:?}/{region:?}: version changed from {} to {}",
                        old.versions_name, version.versions_name
                    );
                }
                if old.build_id != version.build_id {
                    info!(
                        "{program:?}/{region:?}: build ID changed from {} to {}",
                        old.build_id, version.build_id
                    );
                }
                if old.build_config != version.build_config {
                    info!(
                        "{program:?}/{region:?}: build config changed from {} to {}",
                        old.build_config, version.build_config
                    );
                }
            }

            (
                inner.build_configs.get(&version.build_config).cloned(),
                inner.cdn_configs.get(&version.cdn_config).cloned(),
            )
        };

        let (build_config, cdn_config) = match (cached_build, cached_cdn) {
            (Some(build), Some(cdn_cfg)) => (build, cdn_cfg),
            _ => {
                info!(
                    "{program:?}/{region:?}: retrieving configs {} / {}",
                    version.build_config, version.cdn_config
                );
                let (build, cdn_cfg) = tokio::try_join!(
                    self.fetch_build_config(&cdn, &version.build_config, cancel),
                    self.fetch_cdn_config(&cdn, &version.cdn_config, cancel),
                )?;
                let build = Arc::new(build);
                let cdn_cfg = Arc::new(cdn_cfg);

                let mut inner = self.inner.write();
                inner
                    .build_configs
                    .insert(version.build_config, build.clone());
                inner.cdn_configs.insert(version.cdn_config, cdn_cfg.clone());
                (build, cdn_cfg)
            }
        };

        let (cached_encoding, cached_archives) = {
            let inner = self.inner.read();
            (
                inner.encoding_mappers.get(&version.build_config).cloned(),
                inner.archive_mappers.get(&version.cdn_config).cloned(),
            )
        };

        let encoding = match (cached_encoding, cached_archives) {
            (Some(encoding), Some(_)) => encoding,
            _ => {
                let (encoding, archives) = tokio::try_join!(
                    self.build_encoding_mapper(&cdn, &build_config, cancel),
                    async {
                        ArchiveIndex::build(&self.client, &cdn, &cdn_config.archives, cancel)
                            .await
                            .map_err(Error::from)
                    },
                )?;
                let encoding = Arc::new(encoding);

                let mut inner = self.inner.write();
                inner
                    .encoding_mappers
                    .insert(version.build_config, encoding.clone());
                inner
                    .archive_mappers
                    .insert(version.cdn_config, Arc::new(archives));
                encoding
            }
        };

        let have_filenames = {
            let inner = self.inner.read();
            inner.filename_mappers.contains_key(&version.build_config)
        };
        if !have_filenames {
            info!("{program:?}/{region:?}: building filename tree");
            let tree = self
                .build_filename_tree(&cdn, &build_config, &encoding, cancel)
                .await?;

            let mut inner = self.inner.write();
            inner
                .filename_mappers
                .insert(version.build_config, Arc::new(tree));
        }

        let mut inner = self.inner.write();
        inner
            .cdn_infos
            .entry(program.clone())
            .or_default()
            .insert(region.clone(), Arc::new(cdn));
        inner
            .version_infos
            .entry(program.clone())
            .or_default()
            .insert(region.clone(), Arc::new(version));

        Ok(())
    }

    async fn fetch_build_config(
        &self,
        cdn: &CdnInfo,
        hash: &CdnHash,
        cancel: &CancellationToken,
    ) -> Result<BuildConfig> {
        let response = self
            .client
            .get(cdn, ContentType::Config, hash, "", cancel)
            .await?;
        let body = http::read_text(response, cancel).await?;
        Ok(sleet_config::parse_build_config(&body)?)
    }

    async fn fetch_cdn_config(
        &self,
        cdn: &CdnInfo,
        hash: &CdnHash,
        cancel: &CancellationToken,
    ) -> Result<CdnConfig> {
        let response = self
            .client
            .get(cdn, ContentType::Config, hash, "", cancel)
            .await?;
        let body = http::read_text(response, cancel).await?;
        Ok(sleet_config::parse_cdn_config(&body)?)
    }

    /// Fetch the encoding blob, unwrap the container, parse the table.
    async fn build_encoding_mapper(
        &self,
        cdn: &CdnInfo,
        build_config: &BuildConfig,
        cancel: &CancellationToken,
    ) -> Result<EncodingMapper> {
        info!("downloading encoding table {}", build_config.encoding.cdn_hash);
        let response = self
            .client
            .get(
                cdn,
                ContentType::Data,
                &build_config.encoding.cdn_hash,
                "",
                cancel,
            )
            .await?;
        let body = http::read_body(response, cancel).await?;
        let table = blte::Decoder::new(&body[..]).read_to_end().await?;

        let mapper = EncodingMapper::parse(&table)?;
        info!("encoding table ready: {} entries", mapper.len());
        Ok(mapper)
    }

    /// Resolve, fetch and parse the root manifest into a filename tree.
    async fn build_filename_tree(
        &self,
        cdn: &CdnInfo,
        build_config: &BuildConfig,
        encoding: &EncodingMapper,
        cancel: &CancellationToken,
    ) -> Result<FilenameTree> {
        let root_cdn_hash = encoding.lookup(&build_config.root)?;

        let response = self
            .client
            .get(cdn, ContentType::Data, &root_cdn_hash, "", cancel)
            .await?;
        let body = http::read_body(response, cancel).await?;
        let manifest = blte::Decoder::new(&body[..]).read_to_end().await?;

        let files = self.root_parser.file_list(&manifest)?;
        Ok(FilenameTree::build(files)?)
    }

    /// Drop every artifact not reachable from a current version.
    fn evict(&self) {
        let mut inner = self.inner.write();

        let mut live_build: HashSet<CdnHash> = HashSet::new();
        let mut live_cdn: HashSet<CdnHash> = HashSet::new();
        for regions in inner.version_infos.values() {
            for version in regions.values() {
                live_build.insert(version.build_config);
                live_cdn.insert(version.cdn_config);
            }
        }

        let before = inner.build_configs.len()
            + inner.cdn_configs.len()
            + inner.encoding_mappers.len()
            + inner.filename_mappers.len()
            + inner.archive_mappers.len();

        inner.build_configs.retain(|hash, _| live_build.contains(hash));
        inner
            .encoding_mappers
            .retain(|hash, _| live_build.contains(hash));
        inner
            .filename_mappers
            .retain(|hash, _| live_build.contains(hash));
        inner.cdn_configs.retain(|hash, _| live_cdn.contains(hash));
        inner
            .archive_mappers
            .retain(|hash, _| live_cdn.contains(hash));

        let dropped = before
            - (inner.build_configs.len()
                + inner.cdn_configs.len()
                + inner.encoding_mappers.len()
                + inner.filename_mappers.len()
                + inner.archive_mappers.len());

        if dropped > 0 {
            debug!("evicted {dropped} unreferenced artifacts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleet_parser::FileList;

    struct NoopParser;

    impl RootParser for NoopParser {
        fn file_list(&self, _data: &[u8]) -> sleet_parser::Result<FileList> {
            Ok(FileList::new())
        }
    }

    fn datastore() -> Datastore {
        Datastore::new(CdnClient::new().unwrap(), Arc::new(NoopParser))
    }

    #[test]
    fn test_track_is_idempotent() {
        let ds = datastore();
        ds.track(Region::from("eu"), ProgramCode::from("hero"));
        ds.track(Region::from("eu"), ProgramCode::from("hero"));
        ds.track(Region::from("us"), ProgramCode::from("hero"));

        let tracking = ds.tracking();
        assert_eq!(tracking.len(), 2);
        assert_eq!(tracking[0].region, Region::from("eu"));
        assert_eq!(tracking[1].region, Region::from("us"));
    }

    #[test]
    fn test_client_before_update_is_missing() {
        let ds = datastore();
        let err = ds
            .client(&Region::from("eu"), &ProgramCode::from("hero"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Missing {
                what: "CDNInfo",
                ..
            }
        ));
    }
}
