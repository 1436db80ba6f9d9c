//! # PNG Text Annotation Tool
//!
//! This library edits the `tEXt` comments embedded in PNG files by working on
//! the chunk stream directly. Pixel data is never decoded: chunks the caller
//! does not ask for are skipped in the source and written back byte for byte.

// Public API exports
pub mod cli;
pub mod png;
pub mod utils;

pub use png::{Chunk, ChunkKind, PngFile, ReadMode, TextEntry};

/// Result type alias for annotation operations
pub type PngannoResult<T> = Result<T, PngannoError>;

/// Comprehensive error type for the annotation tool
#[derive(Debug, thiserror::Error)]
pub enum PngannoError {
    #[error("Invalid PNG signature")]
    InvalidSignature,

    #[error("Truncated chunk at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedChunk { offset: u64, needed: u64, available: u64 },

    #[error("No IEND chunk before end of input")]
    MissingTerminator,

    #[error("Payload of {0} chunk was not loaded")]
    PayloadNotLoaded(String),

    #[error("Payload of {0} bytes does not fit in a chunk")]
    PayloadTooLarge(usize),

    #[error("Only one of -a, -f, -d, -r or -D should be specified (got {first} and {second})")]
    ConflictingModes { first: String, second: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input file error: {0}")]
    Io(#[from] std::io::Error),
}

impl PngannoError {
    /// True for errors caused by a malformed PNG container
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PngannoError::InvalidSignature
                | PngannoError::TruncatedChunk { .. }
                | PngannoError::MissingTerminator
        )
    }
}
