//! Source file discovery and chunking
//!
//! Walks a checkout and turns every source file into one [`CodeChunk`] ready
//! for embedding.

mod extractor;

pub use extractor::{ChunkExtractor, Chunks, SkippedFile};

use std::path::PathBuf;

/// The text of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the walked root, used as the chunk's identity
    pub relative_path: String,
    /// The file's full text
    pub content: String,
    /// SHA-256 of the content, hex encoded
    pub hash: String,
}
