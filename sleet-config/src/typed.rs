//! Typed extraction of build and CDN configs.

use std::str::FromStr;

use sleet_types::{BuildConfig, CdnConfig, CdnHash, ContentHash, EncodingPointer, EncodingSizes};
use tracing::debug;

use crate::error::{Error, Result};
use crate::text::ConfigText;

/// Keys of the build config.
mod build_keys {
    pub const ROOT: &str = "root";
    pub const INSTALL: &str = "install";
    pub const INSTALL_SIZE: &str = "install-size";
    pub const DOWNLOAD: &str = "download";
    pub const DOWNLOAD_SIZE: &str = "download-size";
    pub const ENCODING: &str = "encoding";
    pub const ENCODING_SIZE: &str = "encoding-size";
    pub const PATCH: &str = "patch";
    pub const PATCH_SIZE: &str = "patch-size";
    pub const PATCH_CONFIG: &str = "patch-config";
}

/// Keys of the CDN config.
mod cdn_keys {
    pub const ARCHIVES: &str = "archives";
    pub const ARCHIVE_GROUP: &str = "archive-group";
    pub const PATCH_ARCHIVES: &str = "patch-archives";
    pub const PATCH_ARCHIVE_GROUP: &str = "patch-archive-group";
}

fn hash_field<H: FromStr>(cfg: &ConfigText, key: &'static str) -> Result<H>
where
    H: Default,
{
    match cfg.get(key) {
        Some(value) => value.parse().map_err(|_| Error::InvalidValue {
            key,
            value: value.to_string(),
        }),
        None => Ok(H::default()),
    }
}

fn size_field(cfg: &ConfigText, key: &'static str) -> Result<u64> {
    match cfg.get(key) {
        Some(value) => value.parse().map_err(|_| Error::InvalidValue {
            key,
            value: value.to_string(),
        }),
        None => Ok(0),
    }
}

fn optional_hash(cfg: &ConfigText, key: &'static str) -> Result<Option<CdnHash>> {
    match cfg.get(key) {
        Some("") | None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidValue {
                key,
                value: value.to_string(),
            }),
    }
}

fn hash_list(cfg: &ConfigText, key: &'static str) -> Result<Vec<CdnHash>> {
    let Some(value) = cfg.get(key) else {
        return Ok(Vec::new());
    };
    value
        .split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| Error::InvalidValue {
                key,
                value: token.to_string(),
            })
        })
        .collect()
}

/// Split a compound value into exactly `expected` whitespace tokens.
fn tokens<'a>(key: &'static str, value: &'a str, expected: usize) -> Result<Vec<&'a str>> {
    let bits: Vec<&str> = value.split_whitespace().collect();
    if bits.len() != expected {
        return Err(Error::TokenCount {
            key,
            expected,
            actual: bits.len(),
        });
    }
    Ok(bits)
}

/// Decode a build configuration body.
///
/// Missing keys leave the corresponding fields at their zero values; a
/// present but malformed value is an error.
pub fn parse_build_config(text: &str) -> Result<BuildConfig> {
    let cfg = ConfigText::parse(text);

    let encoding = match cfg.get(build_keys::ENCODING) {
        Some(value) => {
            let bits = tokens(build_keys::ENCODING, value, 2)?;
            EncodingPointer {
                content_hash: bits[0].parse::<ContentHash>().map_err(|_| {
                    Error::InvalidValue {
                        key: build_keys::ENCODING,
                        value: bits[0].to_string(),
                    }
                })?,
                cdn_hash: bits[1]
                    .parse::<CdnHash>()
                    .map_err(|_| Error::InvalidValue {
                        key: build_keys::ENCODING,
                        value: bits[1].to_string(),
                    })?,
            }
        }
        None => EncodingPointer::default(),
    };

    let encoding_size = match cfg.get(build_keys::ENCODING_SIZE) {
        Some(value) => {
            let bits = tokens(build_keys::ENCODING_SIZE, value, 2)?;
            let parse = |token: &str| -> Result<u64> {
                token.parse().map_err(|_| Error::InvalidValue {
                    key: build_keys::ENCODING_SIZE,
                    value: token.to_string(),
                })
            };
            EncodingSizes {
                uncompressed: parse(bits[0])?,
                compressed: parse(bits[1])?,
            }
        }
        None => EncodingSizes::default(),
    };

    let config = BuildConfig {
        root: hash_field(&cfg, build_keys::ROOT)?,
        install: hash_field(&cfg, build_keys::INSTALL)?,
        install_size: size_field(&cfg, build_keys::INSTALL_SIZE)?,
        download: hash_field(&cfg, build_keys::DOWNLOAD)?,
        download_size: size_field(&cfg, build_keys::DOWNLOAD_SIZE)?,
        encoding,
        encoding_size,
        patch: hash_field(&cfg, build_keys::PATCH)?,
        patch_size: size_field(&cfg, build_keys::PATCH_SIZE)?,
        patch_config: hash_field(&cfg, build_keys::PATCH_CONFIG)?,
    };
    debug!("parsed build config, root {}", config.root);
    Ok(config)
}

/// Decode a CDN configuration body.
pub fn parse_cdn_config(text: &str) -> Result<CdnConfig> {
    let cfg = ConfigText::parse(text);

    let config = CdnConfig {
        archives: hash_list(&cfg, cdn_keys::ARCHIVES)?,
        archive_group: optional_hash(&cfg, cdn_keys::ARCHIVE_GROUP)?,
        patch_archives: hash_list(&cfg, cdn_keys::PATCH_ARCHIVES)?,
        patch_archive_group: optional_hash(&cfg, cdn_keys::PATCH_ARCHIVE_GROUP)?,
    };
    debug!("parsed CDN config with {} archives", config.archives.len());
    Ok(config)
}
