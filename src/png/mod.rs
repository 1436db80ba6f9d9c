//! PNG chunk stream manipulation module

pub mod chunk;
pub mod text;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{info, warn};
use crate::utils::PNG_SIGNATURE;
use crate::{PngannoError, PngannoResult};
pub use chunk::{Body, Chunk, ChunkKind, ReadMode};
pub use text::TextEntry;

/// PNG file as an ordered chunk list plus its IEND terminator
#[derive(Debug, Clone)]
pub struct PngFile {
    chunks: Vec<Chunk>,
    terminator: Chunk,
}

impl PngFile {
    /// Parse a chunk stream from `source`.
    ///
    /// Reads until the IEND chunk; bytes after it are ignored.
    pub fn open<R: Read + Seek>(source: &mut R, mode: ReadMode) -> PngannoResult<Self> {
        let start = source.stream_position()?;
        let end = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(start))?;

        let mut signature = [0u8; 8];
        if end.saturating_sub(start) < 8 {
            return Err(PngannoError::InvalidSignature);
        }
        source.read_exact(&mut signature)?;
        if signature != PNG_SIGNATURE {
            return Err(PngannoError::InvalidSignature);
        }

        let mut chunks = Vec::new();
        loop {
            if source.stream_position()? >= end {
                return Err(PngannoError::MissingTerminator);
            }

            let chunk = Chunk::read_from(source, mode, end)?;
            if chunk.kind() == ChunkKind::Terminator {
                return Ok(Self { chunks, terminator: chunk });
            }
            chunks.push(chunk);
        }
    }

    /// Load PNG file from path
    pub fn from_file(path: &Path, mode: ReadMode) -> PngannoResult<Self> {
        info!("Reading PNG file {}", path.display());
        let mut reader = BufReader::new(File::open(path)?);
        Self::open(&mut reader, mode)
    }

    /// Create from raw data
    pub fn from_data(data: &[u8], mode: ReadMode) -> PngannoResult<Self> {
        Self::open(&mut std::io::Cursor::new(data), mode)
    }

    /// Chunks before IEND, in file order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn terminator(&self) -> &Chunk {
        &self.terminator
    }

    /// Write the signature, every chunk and IEND.
    ///
    /// All chunks must be loaded; use [`PngFile::save_with_source`] after a
    /// selective read.
    pub fn save<W: Write>(&self, sink: &mut W) -> PngannoResult<()> {
        sink.write_all(&PNG_SIGNATURE)?;
        for chunk in self.chunks.iter().chain(std::iter::once(&self.terminator)) {
            chunk.write_to(sink)?;
        }
        sink.flush()?;
        Ok(())
    }

    /// Like [`PngFile::save`], copying skipped chunks from the source they were read from
    pub fn save_with_source<R: Read + Seek, W: Write>(&self, source: &mut R, sink: &mut W) -> PngannoResult<()> {
        sink.write_all(&PNG_SIGNATURE)?;
        for chunk in self.chunks.iter().chain(std::iter::once(&self.terminator)) {
            chunk.copy_to(source, sink)?;
        }
        sink.flush()?;
        Ok(())
    }

    /// Write the PNG to a file
    pub fn write_to_file(&self, path: &Path) -> PngannoResult<()> {
        info!("Writing image to PNG file {}", path.display());
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)
    }

    /// Set the text stored under `key`.
    ///
    /// The first `tEXt` chunk with that key is rewritten in place; otherwise a
    /// new chunk is appended, which puts it just before IEND. Returns the
    /// index of the chunk that now holds the text.
    pub fn set_text(&mut self, key: &[u8], text: &[u8]) -> PngannoResult<usize> {
        let payload = text::encode_payload(key, text)?;

        match self.chunks.iter().position(|c| c.has_text_key(key)) {
            Some(index) => {
                self.chunks[index].set_data(payload)?;
                Ok(index)
            }
            None => {
                self.chunks.push(Chunk::new(chunk::TEXT, payload)?);
                Ok(self.chunks.len() - 1)
            }
        }
    }

    /// Remove every `tEXt` chunk whose key is in `keys`, keeping the order of
    /// everything else. Returns the keys that were removed, in chunk order.
    pub fn delete_by_keys<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Vec<Vec<u8>> {
        let wanted = |chunk: &Chunk| keys.iter().any(|k| chunk.has_text_key(k.as_ref()));

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks.drain(..) {
            if wanted(&chunk) {
                if let Some(key) = chunk.text_key() {
                    info!("{} (deleted)", String::from_utf8_lossy(key));
                    removed.push(key.to_vec());
                }
            } else {
                kept.push(chunk);
            }
        }
        self.chunks = kept;

        for key in keys {
            if !removed.iter().any(|r| r.as_slice() == key.as_ref()) {
                warn!("Key {} not found", String::from_utf8_lossy(key.as_ref()));
            }
        }
        removed
    }

    /// Text for each requested key, in request order. Keys without a
    /// matching chunk are left out.
    pub fn get_by_keys<K: AsRef<[u8]>>(&self, keys: &[K]) -> Vec<TextEntry> {
        keys.iter()
            .filter_map(|key| {
                self.chunks
                    .iter()
                    .find(|c| c.has_text_key(key.as_ref()))
                    .and_then(Chunk::text_entry)
            })
            .collect()
    }

    /// Keys of all loaded `tEXt` chunks, in file order
    pub fn text_keys(&self) -> Vec<&[u8]> {
        self.chunks.iter().filter_map(Chunk::text_key).collect()
    }

    /// Tag and length of every chunk, IEND included
    pub fn chunk_summary(&self) -> Vec<(String, u32)> {
        self.chunks
            .iter()
            .chain(std::iter::once(&self.terminator))
            .map(|c| (c.tag(), c.length()))
            .collect()
    }
}
