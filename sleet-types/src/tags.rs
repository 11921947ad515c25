//! Region, program and content-type tags.

use std::fmt;

/// A game region, used to pick the discovery endpoint and mirror set.
///
/// Regions are short opaque tags (`us`, `eu`, ...); new ones appear
/// without notice, so this is a string wrapper rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

/// A product release channel.
///
/// Release and test channels of the same game are distinct program codes
/// even when they share CDN storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramCode(String);

impl ProgramCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProgramCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// The kind of object being fetched from a mirror.
///
/// Each kind lives under its own directory in the CDN path layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Build and CDN configuration files.
    Config,
    /// Data blobs, archives and archive indices.
    Data,
    /// Patch blobs and patch archives.
    Patch,
}

impl ContentType {
    /// The URL path segment for this content type.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentType::Config => "config",
            ContentType::Data => "data",
            ContentType::Patch => "patch",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
