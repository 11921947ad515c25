//! Sequential chunk-at-a-time decoding.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::chunk::ChunkInfo;
use crate::error::{Error, Result};
use crate::{BLTE_MAGIC, CompressionMode};

/// How the stream is framed, decided once the header has been read.
#[derive(Debug)]
enum Framing {
    /// `header_size == 0`: one implicit chunk spanning the rest of the
    /// stream, with no declared sizes and no checksum.
    Single,
    /// A chunk table was present.
    Chunked(Vec<ChunkInfo>),
}

/// Streaming BLTE decoder.
///
/// Pull decoded chunks with [`next_chunk`](Decoder::next_chunk); the
/// concatenation of all chunks, in order, is the original payload.
/// Dropping the decoder drops the underlying reader.
pub struct Decoder<R> {
    reader: R,
    framing: Option<Framing>,
    next_index: usize,
    done: bool,
}

impl<R> std::fmt::Debug for Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("framing", &self.framing)
            .field("next_index", &self.next_index)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framing: None,
            next_index: 0,
            done: false,
        }
    }

    async fn read_header(&mut self) -> Result<Framing> {
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic).await?;
        if magic != BLTE_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let header_size = self.reader.read_u32().await?;
        if header_size == 0 {
            return Ok(Framing::Single);
        }

        let _flags = self.reader.read_u8().await?;
        let mut count_bytes = [0u8; 3];
        self.reader.read_exact(&mut count_bytes).await?;
        let chunk_count = u32::from_be_bytes([0, count_bytes[0], count_bytes[1], count_bytes[2]]);

        // The declared size must account for exactly this many records.
        let expected = 8 + 4 + 24u32
            .checked_mul(chunk_count)
            .ok_or(Error::InvalidHeaderSize(header_size))?;
        if header_size != expected {
            return Err(Error::InvalidHeaderSize(header_size));
        }

        trace!("chunk table with {chunk_count} entries");

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            let compressed_size = self.reader.read_u32().await?;
            let decompressed_size = self.reader.read_u32().await?;
            let mut digest = [0u8; 16];
            self.reader.read_exact(&mut digest).await?;
            chunks.push(ChunkInfo {
                compressed_size,
                decompressed_size,
                digest,
            });
        }

        Ok(Framing::Chunked(chunks))
    }

    /// Decode and return the next chunk, or `None` at the end of the
    /// stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.framing.is_none() {
            let framing = self.read_header().await?;
            self.framing = Some(framing);
        }

        match self.framing.as_ref().unwrap_or(&Framing::Single) {
            Framing::Single => {
                if self.done {
                    return Ok(None);
                }
                self.done = true;

                let mut body = Vec::new();
                self.reader.read_to_end(&mut body).await?;
                let payload = decode_body(0, &body, None)?;
                Ok(Some(payload))
            }
            Framing::Chunked(chunks) => {
                let index = self.next_index;
                let Some(info) = chunks.get(index).copied() else {
                    return Ok(None);
                };

                let mut body = vec![0u8; info.compressed_size as usize];
                self.reader.read_exact(&mut body).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        Error::TruncatedChunk { chunk: index }
                    } else {
                        Error::Io(e)
                    }
                })?;

                let digest = md5::compute(&body);
                if digest.0 != info.digest {
                    return Err(Error::ChecksumMismatch {
                        chunk: index,
                        expected: hex::encode(info.digest),
                        actual: hex::encode(digest.0),
                    });
                }

                let payload = decode_body(index, &body, Some(info.decompressed_size))?;
                self.next_index = index + 1;
                Ok(Some(payload))
            }
        }
    }

    /// Decode the remaining chunks into one buffer.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// The chunk table, once the header has been read. `None` before the
    /// first `next_chunk` call and for single-chunk streams.
    pub fn chunks(&self) -> Option<&[ChunkInfo]> {
        match self.framing.as_ref()? {
            Framing::Single => None,
            Framing::Chunked(chunks) => Some(chunks),
        }
    }
}

/// Decode one stored chunk body (mode byte plus payload).
///
/// `declared` is the decompressed size from the chunk table, absent for
/// the implicit single-chunk framing.
fn decode_body(index: usize, body: &[u8], declared: Option<u32>) -> Result<Vec<u8>> {
    let Some((&mode, payload)) = body.split_first() else {
        return Err(Error::TruncatedChunk { chunk: index });
    };

    let decoded = match CompressionMode::from_byte(mode) {
        Some(CompressionMode::None) => payload.to_vec(),
        Some(CompressionMode::ZLib) => {
            let mut out = Vec::with_capacity(declared.unwrap_or(0) as usize);
            ZlibDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| Error::DecompressionFailed {
                    chunk: index,
                    reason: e.to_string(),
                })?;
            out
        }
        None => return Err(Error::UnsupportedCompression(mode)),
    };

    if let Some(expected) = declared {
        if decoded.len() != expected as usize {
            return Err(Error::SizeMismatch {
                chunk: index,
                expected,
                actual: decoded.len(),
            });
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn test_mode_bytes() {
        assert_eq!(CompressionMode::from_byte(b'N'), Some(CompressionMode::None));
        assert_eq!(CompressionMode::from_byte(b'Z'), Some(CompressionMode::ZLib));
        assert_eq!(CompressionMode::from_byte(b'E'), None);
        assert_eq!(CompressionMode::ZLib.as_byte(), b'Z');
    }

    #[tokio::test]
    async fn test_single_implicit_chunk_plain() {
        let framed = encode::encode_single(b"hooray!", CompressionMode::None);
        let mut decoder = Decoder::new(&framed[..]);
        assert_eq!(decoder.read_to_end().await.unwrap(), b"hooray!");
    }

    #[tokio::test]
    async fn test_single_zlib_chunk_with_table() {
        let payload = b"this BLTE file contains zlib-compressed data, with a single chunk";
        let framed = encode::encode_chunks(&[(CompressionMode::ZLib, payload.as_slice())]);

        let mut decoder = Decoder::new(&framed[..]);
        let first = decoder.next_chunk().await.unwrap().unwrap();
        assert_eq!(first, payload);
        assert_eq!(decoder.chunks().unwrap().len(), 1);
        assert!(decoder.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_many_chunks_mixed_modes() {
        // More chunks than fit in a single count byte, alternating modes.
        let chunks: Vec<(CompressionMode, Vec<u8>)> = (0u32..300)
            .map(|i| {
                let mode = if i % 2 == 0 {
                    CompressionMode::None
                } else {
                    CompressionMode::ZLib
                };
                (mode, format!("chunk {i} payload").into_bytes())
            })
            .collect();
        let borrowed: Vec<(CompressionMode, &[u8])> =
            chunks.iter().map(|(m, d)| (*m, d.as_slice())).collect();
        let framed = encode::encode_chunks(&borrowed);

        let mut decoder = Decoder::new(&framed[..]);
        let decoded = decoder.read_to_end().await.unwrap();

        let expected: Vec<u8> = chunks.iter().flat_map(|(_, d)| d.clone()).collect();
        assert_eq!(decoded, expected);
    }

    #[tokio::test]
    async fn test_corrupt_chunk_fails_at_that_chunk() {
        let chunks: Vec<(CompressionMode, Vec<u8>)> = (0u32..8)
            .map(|i| (CompressionMode::None, vec![i as u8; 32]))
            .collect();
        let borrowed: Vec<(CompressionMode, &[u8])> =
            chunks.iter().map(|(m, d)| (*m, d.as_slice())).collect();
        let mut framed = encode::encode_chunks(&borrowed);

        // Flip a byte in the fourth chunk's body. Header is 12 + 8 * 24
        // bytes, each stored chunk is 33 bytes (mode byte + 32).
        let body_start = 12 + 8 * 24;
        framed[body_start + 3 * 33 + 10] ^= 0xff;

        let mut decoder = Decoder::new(&framed[..]);
        for _ in 0..3 {
            decoder.next_chunk().await.unwrap().unwrap();
        }
        let err = decoder.next_chunk().await.unwrap_err();
        assert!(
            matches!(err, Error::ChecksumMismatch { chunk: 3, .. }),
            "actual error: {err:?}",
        );
    }

    #[tokio::test]
    async fn test_invalid_magic() {
        let err = Decoder::new(&b"BAD!\x00\x00\x00\x00"[..])
            .next_chunk()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(_)));
    }

    #[tokio::test]
    async fn test_header_size_must_match_chunk_count() {
        let mut framed = Vec::new();
        framed.extend_from_slice(b"BLTE");
        framed.extend_from_slice(&100u32.to_be_bytes()); // wrong: not 8 + 4 + n*24
        framed.push(0x0f);
        framed.extend_from_slice(&[0x00, 0x00, 0x02]);

        let err = Decoder::new(&framed[..]).next_chunk().await.unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderSize(100)));
    }

    #[tokio::test]
    async fn test_unsupported_mode() {
        let framed = encode::encode_single(b"data", CompressionMode::None);
        let mut bad = framed.clone();
        bad[8] = b'E'; // encrypted blocks are not part of this profile

        let err = Decoder::new(&bad[..]).next_chunk().await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedCompression(b'E')));
    }

    #[tokio::test]
    async fn test_declared_size_is_enforced() {
        let framed = encode::encode_chunks(&[(CompressionMode::None, b"1234".as_slice())]);
        let mut bad = framed.clone();
        // Overwrite the declared decompressed size (offset 12 + 4). The
        // digest covers only the chunk body, so the size check trips.
        bad[16..20].copy_from_slice(&9u32.to_be_bytes());
        let err = Decoder::new(&bad[..]).next_chunk().await.unwrap_err();
        assert!(
            matches!(
                err,
                Error::SizeMismatch {
                    chunk: 0,
                    expected: 9,
                    actual: 4,
                }
            ),
            "actual error: {err:?}",
        );
    }

    #[tokio::test]
    async fn test_truncated_chunk_body() {
        let framed = encode::encode_chunks(&[(CompressionMode::None, b"1234".as_slice())]);
        let err = Decoder::new(&framed[..framed.len() - 2])
            .next_chunk()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TruncatedChunk { chunk: 0 }));
    }
}
