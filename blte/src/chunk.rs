//! Chunk table entries.

/// One entry of the chunk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Size of the chunk body as stored, including the mode byte.
    pub compressed_size: u32,
    /// Size of the chunk after decompression.
    pub decompressed_size: u32,
    /// MD5 of the stored chunk body, mode byte included.
    pub digest: [u8; 16],
}
