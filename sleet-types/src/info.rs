//! Records describing a deployed build and where to fetch it from.

use crate::hash::{CdnHash, ContentHash};
use crate::tags::Region;

/// Which mirrors hold data for a region, and the path they store it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnInfo {
    /// Region this entry applies to.
    pub name: Region,
    /// Path prefix on the mirror, e.g. `tpr/Hero-Live-a`.
    pub path: String,
    /// Mirror hostnames in preference order. Never empty.
    pub hosts: Vec<String>,
    /// Path prefix for configuration data on the mirror.
    pub config_path: String,
}

/// The currently deployed build for a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub region: Region,
    /// CDN hash of the build configuration file.
    pub build_config: CdnHash,
    /// CDN hash of the CDN configuration file.
    pub cdn_config: CdnHash,
    /// CDN hash of the key ring, when the product ships one.
    pub key_ring: Option<CdnHash>,
    pub build_id: u32,
    /// Human-readable version string, e.g. `24.3.52008`.
    pub versions_name: String,
    pub product_config: CdnHash,
}

/// The content and CDN hashes of the encoding table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingPointer {
    pub content_hash: ContentHash,
    pub cdn_hash: CdnHash,
}

/// Raw and framed sizes of the encoding table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingSizes {
    pub uncompressed: u64,
    pub compressed: u64,
}

/// A build configuration: the root, install, download, encoding and patch
/// artifacts of one deployed build.
///
/// Fields that are absent from the config text stay at their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    pub root: ContentHash,

    pub install: ContentHash,
    pub install_size: u64,

    pub download: ContentHash,
    pub download_size: u64,

    pub encoding: EncodingPointer,
    pub encoding_size: EncodingSizes,

    pub patch: ContentHash,
    pub patch_size: u64,
    pub patch_config: CdnHash,
}

/// A CDN configuration: the archives that bundle small files together on
/// the mirrors, plus the equivalent set for patch data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnConfig {
    /// Archive CDN hashes, in the order the config lists them.
    pub archives: Vec<CdnHash>,
    pub archive_group: Option<CdnHash>,

    pub patch_archives: Vec<CdnHash>,
    pub patch_archive_group: Option<CdnHash>,
}

/// Maps human-meaningful file paths to content hashes.
///
/// Implemented by the filename tree; the underlying data may come from
/// any of the product-specific root manifest formats.
pub trait FilenameMapper: Send + Sync {
    /// Returns the content hash for `path`, or `None` if no such file
    /// exists in the manifest.
    fn content_hash(&self, path: &str) -> Option<ContentHash>;
}
