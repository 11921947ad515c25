//! Minimal BLTE framing support.
//!
//! The client never writes back to the remote store; this exists so
//! fixtures and round-trip tests can produce well-formed containers.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::{BLTE_MAGIC, CompressionMode};

/// Encode one stored chunk body: mode byte plus payload.
fn encode_chunk_body(mode: CompressionMode, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![mode.as_byte()];
    match mode {
        CompressionMode::None => body.extend_from_slice(payload),
        CompressionMode::ZLib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            // Writing to a Vec cannot fail.
            encoder.write_all(payload).unwrap();
            body.extend_from_slice(&encoder.finish().unwrap());
        }
    }
    body
}

/// Frame a payload as a single implicit chunk (`header_size == 0`):
/// no chunk table, no checksum.
pub fn encode_single(payload: &[u8], mode: CompressionMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    out.extend_from_slice(&BLTE_MAGIC);
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&encode_chunk_body(mode, payload));
    out
}

/// Frame a sequence of payloads as a chunk table with per-chunk MD5
/// checksums.
pub fn encode_chunks(chunks: &[(CompressionMode, &[u8])]) -> Vec<u8> {
    let bodies: Vec<Vec<u8>> = chunks
        .iter()
        .map(|&(mode, payload)| encode_chunk_body(mode, payload))
        .collect();

    let header_size = 8 + 4 + 24 * chunks.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&BLTE_MAGIC);
    out.extend_from_slice(&header_size.to_be_bytes());
    out.push(0x0f);
    out.extend_from_slice(&(chunks.len() as u32).to_be_bytes()[1..4]);

    for (body, &(_, payload)) in bodies.iter().zip(chunks) {
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&md5::compute(body).0);
    }
    for body in &bodies {
        out.extend_from_slice(body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame_layout() {
        let framed = encode_single(b"ab", CompressionMode::None);
        assert_eq!(&framed[0..4], b"BLTE");
        assert_eq!(&framed[4..8], &[0, 0, 0, 0]);
        assert_eq!(&framed[8..], b"Nab");
    }

    #[test]
    fn test_chunked_frame_layout() {
        let framed = encode_chunks(&[(CompressionMode::None, b"abcd".as_slice())]);
        assert_eq!(&framed[0..4], b"BLTE");
        assert_eq!(u32::from_be_bytes(framed[4..8].try_into().unwrap()), 36);
        assert_eq!(&framed[9..12], &[0, 0, 1]);
        // Declared checksum matches the stored body.
        let digest = md5::compute(b"Nabcd");
        assert_eq!(&framed[20..36], &digest.0);
    }
}
