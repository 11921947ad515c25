//! Fixture builders for the binary formats.
//!
//! Production code never writes these formats; the builders exist so
//! tests across the workspace can construct well-formed tables without
//! shipping binary fixtures.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use sleet_types::{CdnHash, ContentHash};

const PAGE_SIZE: usize = 4096;

/// Build an encoding table holding the given records, one key page per
/// 4096 bytes, with a correct page index and checksums.
pub fn encoding_table(entries: &[(ContentHash, Vec<CdnHash>)]) -> Vec<u8> {
    // Pack entries into pages.
    let mut pages: Vec<Vec<u8>> = Vec::new();
    let mut page: Vec<u8> = Vec::new();
    for (content, cdn_hashes) in entries {
        let len = 2 + 4 + 16 + cdn_hashes.len() * 16;
        assert!(len <= PAGE_SIZE, "record does not fit in a page");
        if page.len() + len + 2 > PAGE_SIZE {
            pages.push(std::mem::take(&mut page));
        }

        let mut count = [0u8; 2];
        LittleEndian::write_u16(&mut count, cdn_hashes.len() as u16);
        page.extend_from_slice(&count);
        page.extend_from_slice(&[0u8; 4]); // file size info
        page.extend_from_slice(content.as_bytes());
        for cdn in cdn_hashes {
            page.extend_from_slice(cdn.as_bytes());
        }
    }
    if !page.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    for page in &mut pages {
        page.resize(PAGE_SIZE, 0);
    }

    // Header.
    let mut out = Vec::new();
    out.extend_from_slice(b"EN");
    out.push(1); // version
    out.push(0x10);
    out.push(0x10);
    out.extend_from_slice(&[0u8; 4]); // flag words
    let mut count = [0u8; 4];
    BigEndian::write_u32(&mut count, pages.len() as u32);
    out.extend_from_slice(&count); // key page count
    out.extend_from_slice(&[0u8; 4]); // layout page count
    out.push(0);
    out.extend_from_slice(&[0u8; 4]); // string table size

    // Page index: first hash of the page, then the page MD5.
    for page in &pages {
        let first_hash = &page[6..22];
        out.extend_from_slice(first_hash);
        out.extend_from_slice(&md5::compute(page).0);
    }

    for page in &pages {
        out.extend_from_slice(page);
    }
    out
}

/// Build an archive `.index` body from `(cdn_hash, size, offset)`
/// entries, chunked and zero-terminated the way mirrors serve them.
pub fn archive_index(entries: &[(CdnHash, u32, u32)]) -> Vec<u8> {
    const ENTRIES_PER_CHUNK: usize = 170;

    let mut out = Vec::new();
    for chunk in entries.chunks(ENTRIES_PER_CHUNK) {
        let mut body = Vec::with_capacity(PAGE_SIZE);
        for (hash, size, offset) in chunk {
            body.extend_from_slice(hash.as_bytes());
            let mut word = [0u8; 4];
            BigEndian::write_u32(&mut word, *size);
            body.extend_from_slice(&word);
            BigEndian::write_u32(&mut word, *offset);
            body.extend_from_slice(&word);
        }
        body.resize(PAGE_SIZE, 0);
        out.extend_from_slice(&body);
    }
    out
}
