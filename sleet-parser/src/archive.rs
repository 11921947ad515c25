//! Archive index (`.index`) parsing.
//!
//! An archive bundles many framed blobs into one large CDN object; its
//! index maps each member's CDN hash to a byte range. The index body is
//! a sequence of 4096-byte chunks, each holding up to 170 entries of 24
//! bytes. The first all-zero entry terminates a chunk (the remainder is
//! padding); a trailing partial chunk terminates the file.

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use sleet_types::CdnHash;

use crate::error::{Error, Result};

/// Index chunk size in bytes.
pub const INDEX_CHUNK_SIZE: usize = 4096;
/// Maximum entries per index chunk.
pub const INDEX_ENTRIES_PER_CHUNK: usize = 170;

const ENTRY_LEN: usize = 24;

/// One member of an archive: where its bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub cdn_hash: CdnHash,
    pub size: u32,
    pub offset: u32,
}

/// Parse a complete `.index` body.
pub fn parse_index(data: &[u8]) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();

    for chunk in data.chunks_exact(INDEX_CHUNK_SIZE) {
        for n in 0..INDEX_ENTRIES_PER_CHUNK {
            let entry = &chunk[n * ENTRY_LEN..(n + 1) * ENTRY_LEN];
            if entry.iter().all(|&b| b == 0) {
                break;
            }

            let cdn_hash = CdnHash::new(entry[0..16].try_into().expect("sliced to 16 bytes"));
            let size = BigEndian::read_u32(&entry[16..20]);
            let offset = BigEndian::read_u32(&entry[20..24]);

            // The member must lie entirely within a u32-addressable
            // archive.
            offset
                .checked_add(size)
                .ok_or(Error::IndexEntryOverflow { offset, size })?;

            entries.push(IndexEntry {
                cdn_hash,
                size,
                offset,
            });
        }
    }

    trace!("parsed archive index with {} entries", entries.len());
    Ok(entries)
}
