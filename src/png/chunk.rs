//! PNG chunk reading and writing with selective payload loading

use std::io::{self, Read, Seek, SeekFrom, Write};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;
use crate::png::text::{self, TextEntry};
use crate::utils::chunk_crc;
use crate::{PngannoError, PngannoResult};

/// Type tag of text comment chunks
pub const TEXT: [u8; 4] = *b"tEXt";
/// Type tag of the terminating chunk
pub const IEND: [u8; 4] = *b"IEND";

/// Length, type and CRC fields around every payload
const CHUNK_OVERHEAD: u64 = 12;

/// Which chunk payloads to load into memory while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Load every payload
    Full,
    /// Load only `tEXt` payloads, skip the rest
    TextOnly,
    /// Load nothing
    Skip,
}

impl ReadMode {
    fn loads(self, chunk_type: &[u8; 4]) -> bool {
        match self {
            ReadMode::Full => true,
            ReadMode::TextOnly => *chunk_type == TEXT,
            ReadMode::Skip => false,
        }
    }
}

/// Behaviour a chunk gets from its type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Generic,
    Text,
    Terminator,
}

impl ChunkKind {
    pub fn of(chunk_type: &[u8; 4]) -> Self {
        match chunk_type {
            b"tEXt" => ChunkKind::Text,
            b"IEND" => ChunkKind::Terminator,
            _ => ChunkKind::Generic,
        }
    }
}

/// Payload and CRC of a chunk, or where to find them in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Loaded { data: Vec<u8>, crc: u32 },
    Skipped { offset: u64 },
}

/// PNG chunk structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    length: u32,
    chunk_type: [u8; 4],
    body: Body,
}

/// Map an early end of input to a truncation error for the chunk at `offset`
fn eof_as_truncated(offset: u64, needed: u64, available: u64) -> impl Fn(io::Error) -> PngannoError {
    move |err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            PngannoError::TruncatedChunk { offset, needed, available }
        } else {
            PngannoError::Io(err)
        }
    }
}

impl Chunk {
    /// Build a chunk from a type and payload, computing length and CRC
    pub fn new(chunk_type: [u8; 4], data: Vec<u8>) -> PngannoResult<Self> {
        let length = u32::try_from(data.len())
            .map_err(|_| PngannoError::PayloadTooLarge(data.len()))?;
        let crc = chunk_crc(&chunk_type, &data);
        Ok(Self { length, chunk_type, body: Body::Loaded { data, crc } })
    }

    /// Build a `tEXt` chunk holding `key NUL text`
    pub fn new_text(key: &[u8], text: &[u8]) -> PngannoResult<Self> {
        Self::new(TEXT, text::encode_payload(key, text)?)
    }

    /// Payload length as stored in the length field
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn chunk_type(&self) -> [u8; 4] {
        self.chunk_type
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn kind(&self) -> ChunkKind {
        ChunkKind::of(&self.chunk_type)
    }

    /// Type tag as a string
    pub fn tag(&self) -> String {
        String::from_utf8_lossy(&self.chunk_type).into_owned()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.body, Body::Loaded { .. })
    }

    /// Payload bytes, if they were read
    pub fn data(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Loaded { data, .. } => Some(data),
            Body::Skipped { .. } => None,
        }
    }

    /// Stored CRC, if it was read
    pub fn crc(&self) -> Option<u32> {
        match self.body {
            Body::Loaded { crc, .. } => Some(crc),
            Body::Skipped { .. } => None,
        }
    }

    /// Key of a loaded `tEXt` chunk. Empty when the payload has no separator.
    pub fn text_key(&self) -> Option<&[u8]> {
        if self.kind() != ChunkKind::Text {
            return None;
        }
        self.data().map(|data| text::split_key(data).0)
    }

    /// True if this is a `tEXt` chunk whose key is exactly `key`
    pub fn has_text_key(&self, key: &[u8]) -> bool {
        match self.data() {
            Some(data) if self.kind() == ChunkKind::Text => {
                matches!(text::split_key(data), (k, Some(_)) if k == key)
            }
            _ => false,
        }
    }

    /// Decoded key and text of a well-formed, loaded `tEXt` chunk
    pub fn text_entry(&self) -> Option<TextEntry> {
        if self.kind() != ChunkKind::Text {
            return None;
        }
        let data = self.data()?;
        let (key, _) = text::split_key(data);
        let value = text::text_value(data)?;
        Some(TextEntry::new(key, value))
    }

    /// Replace the payload, recomputing length and CRC
    pub fn set_data(&mut self, data: Vec<u8>) -> PngannoResult<()> {
        *self = Self::new(self.chunk_type, data)?;
        Ok(())
    }

    /// Read one chunk from `source`, which must not extend past `end`.
    ///
    /// Payloads not selected by `mode` are seeked over, leaving the source at
    /// the start of the next chunk.
    pub fn read_from<R: Read + Seek>(source: &mut R, mode: ReadMode, end: u64) -> PngannoResult<Self> {
        let offset = source.stream_position()?;
        let available = end.saturating_sub(offset);
        if available < 8 {
            return Err(PngannoError::TruncatedChunk { offset, needed: 8, available });
        }

        let length = source.read_u32::<BigEndian>().map_err(eof_as_truncated(offset, 8, available))?;
        let mut chunk_type = [0u8; 4];
        source.read_exact(&mut chunk_type).map_err(eof_as_truncated(offset, 8, available))?;

        let needed = length as u64 + CHUNK_OVERHEAD;
        if available < needed {
            return Err(PngannoError::TruncatedChunk { offset, needed, available });
        }

        let body = if mode.loads(&chunk_type) {
            let mut data = vec![0u8; length as usize];
            source.read_exact(&mut data).map_err(eof_as_truncated(offset, needed, available))?;
            let crc = source.read_u32::<BigEndian>().map_err(eof_as_truncated(offset, needed, available))?;
            Body::Loaded { data, crc }
        } else {
            let payload_offset = offset + 8;
            source.seek(SeekFrom::Start(payload_offset + length as u64 + 4))?;
            Body::Skipped { offset: payload_offset }
        };

        let chunk = Self { length, chunk_type, body };
        debug!(offset, tag = %chunk.tag(), length, loaded = chunk.is_loaded(), "read chunk");
        Ok(chunk)
    }

    /// Write length, type, payload and CRC. Fails for skipped chunks.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> PngannoResult<()> {
        match &self.body {
            Body::Loaded { data, crc } => {
                sink.write_u32::<BigEndian>(self.length)?;
                sink.write_all(&self.chunk_type)?;
                sink.write_all(data)?;
                sink.write_u32::<BigEndian>(*crc)?;
                Ok(())
            }
            Body::Skipped { .. } => Err(PngannoError::PayloadNotLoaded(self.tag())),
        }
    }

    /// Write this chunk, taking skipped payload and CRC bytes verbatim from
    /// the source it was read from
    pub fn copy_to<R: Read + Seek, W: Write>(&self, source: &mut R, sink: &mut W) -> PngannoResult<()> {
        let Body::Skipped { offset } = self.body else {
            return self.write_to(sink);
        };

        sink.write_u32::<BigEndian>(self.length)?;
        sink.write_all(&self.chunk_type)?;

        // Payload plus trailing CRC
        let needed = self.length as u64 + 4;
        source.seek(SeekFrom::Start(offset))?;
        let copied = io::copy(&mut source.by_ref().take(needed), sink)?;
        if copied != needed {
            return Err(PngannoError::TruncatedChunk {
                offset: offset - 8,
                needed: needed + 8,
                available: copied + 8,
            });
        }
        Ok(())
    }
}
