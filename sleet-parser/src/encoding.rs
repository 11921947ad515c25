//! Encoding table parsing and lookup.
//!
//! The encoding table is the translation layer between content hashes
//! and CDN hashes. On the wire it is a page-structured binary file:
//! a 22-byte header, a layout-string table (skipped), a page index whose
//! records carry each page's MD5, then the 4096-byte key pages
//! themselves, then layout tables this client does not use.
//!
//! All multi-byte header fields are big-endian; the per-entry CDN-hash
//! count inside a page is little-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::debug;

use sleet_types::{CdnHash, ContentHash};

use crate::error::{Error, Result};

const HEADER_LEN: usize = 22;
const PAGE_SIZE: usize = 4096;
/// Page entry header: CDN-hash count, file size info, content hash.
const ENTRY_HEADER_LEN: usize = 2 + 4 + 16;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    content: ContentHash,
    cdn: Vec<CdnHash>,
}

/// In-memory mapping from content hash to CDN hashes.
///
/// Entries are kept sorted by content hash; lookup is a binary search.
/// The mapper is immutable once built and safe to share across threads.
#[derive(Debug)]
pub struct EncodingMapper {
    entries: Vec<Entry>,
}

impl EncodingMapper {
    /// Parse a fully decoded (container-unwrapped) encoding table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = data.get(..HEADER_LEN).ok_or(Error::UnexpectedEof)?;
        if header[0] != b'E' || header[1] != b'N' {
            return Err(Error::BadMagic);
        }

        let hash_size_a = header[3];
        let hash_size_b = header[4];
        if hash_size_a != 0x10 || hash_size_b != 0x10 {
            return Err(Error::BadHashSize {
                a: hash_size_a,
                b: hash_size_b,
            });
        }

        let _flags_a = BigEndian::read_u16(&header[5..7]);
        let _flags_b = BigEndian::read_u16(&header[7..9]);
        let page_count = BigEndian::read_u32(&header[9..13]) as usize;
        let layout_page_count = BigEndian::read_u32(&header[13..17]) as usize;
        let string_size = BigEndian::read_u32(&header[18..22]) as usize;

        debug!(
            "encoding table: {page_count} key pages, {layout_page_count} layout pages, \
             {string_size} byte string table"
        );

        let mut rest = data.get(HEADER_LEN..).ok_or(Error::UnexpectedEof)?;

        // The layout string table carries compression specs for the
        // layout side of the file; nothing here needs it.
        rest = rest.get(string_size..).ok_or(Error::UnexpectedEof)?;

        // Page index: 32-byte records, the last 16 bytes of each are the
        // MD5 of the corresponding key page.
        let index_len = page_count
            .checked_mul(32)
            .ok_or(Error::UnexpectedEof)?;
        let index = rest.get(..index_len).ok_or(Error::UnexpectedEof)?;
        rest = &rest[index_len..];

        let mut entries = Vec::new();
        for page_no in 0..page_count {
            let page = rest.get(..PAGE_SIZE).ok_or(Error::UnexpectedEof)?;
            rest = &rest[PAGE_SIZE..];

            let expected = &index[page_no * 32 + 16..page_no * 32 + 32];
            let digest = md5::compute(page);
            if digest.0 != expected {
                return Err(Error::PageChecksumMismatch {
                    page: page_no,
                    expected: hex::encode(expected),
                    actual: hex::encode(digest.0),
                });
            }

            parse_page(page_no, page, &mut entries)?;
        }

        // Layout table index and pages; the trailing layout string that
        // describes the whole file is deliberately never consumed.
        let layout_len = layout_page_count
            .checked_mul(32 + PAGE_SIZE)
            .ok_or(Error::UnexpectedEof)?;
        if rest.len() < layout_len {
            return Err(Error::UnexpectedEof);
        }

        entries.sort_unstable_by(|a, b| a.content.cmp(&b.content).then_with(|| a.cdn.cmp(&b.cdn)));
        entries.dedup();

        debug!("encoding table: {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Translate a content hash to its CDN hash.
    ///
    /// Fails with [`Error::UnknownContentHash`] when the hash is absent
    /// and [`Error::AmbiguousContentHash`] when the record carries more
    /// than one CDN hash — selection among multiples has no defined
    /// semantics, so the conservative failure is preserved.
    pub fn lookup(&self, content: &ContentHash) -> Result<CdnHash> {
        let i = self.entries.partition_point(|e| e.content < *content);
        let entry = self
            .entries
            .get(i)
            .filter(|e| e.content == *content)
            .ok_or(Error::UnknownContentHash)?;

        match entry.cdn.as_slice() {
            [one] => Ok(*one),
            [] => Err(Error::UnknownContentHash),
            _ => Err(Error::AmbiguousContentHash),
        }
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Content hashes in ascending order, for diagnostics.
    pub fn content_hashes(&self) -> impl Iterator<Item = &ContentHash> {
        self.entries.iter().map(|e| &e.content)
    }
}

/// Parse one 4096-byte key page. A zero CDN-hash count ends the page;
/// the rest is padding.
fn parse_page(page_no: usize, page: &[u8], out: &mut Vec<Entry>) -> Result<()> {
    let mut off = 0;
    loop {
        if off + 2 > page.len() {
            break;
        }
        let count = LittleEndian::read_u16(&page[off..off + 2]) as usize;
        if count == 0 {
            break;
        }

        let len = ENTRY_HEADER_LEN + count * 16;
        let entry = page
            .get(off..off + len)
            .ok_or(Error::TruncatedPageEntry { page: page_no })?;

        let content = ContentHash::new(entry[6..22].try_into().expect("sliced to 16 bytes"));
        let cdn = entry[ENTRY_HEADER_LEN..]
            .chunks_exact(16)
            .map(|raw| CdnHash::new(raw.try_into().expect("sliced to 16 bytes")))
            .collect();

        out.push(Entry { content, cdn });
        off += len;
    }
    Ok(())
}
