use serde::{Deserialize, Serialize};

/// Outcome of one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Collection the chunks were written to
    pub collection: String,
    /// Files read into chunks
    pub files_read: usize,
    /// Chunks that received an embedding
    pub chunks_embedded: usize,
    /// Rows the vector store reported as inserted
    pub chunks_stored: usize,
    /// Files skipped while walking, as "path: reason"
    #[serde(default)]
    pub skipped_files: Vec<String>,
    /// Chunks whose embedding failed, as "path: reason"
    #[serde(default)]
    pub failed_chunks: Vec<String>,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

impl IngestReport {
    /// True when every file that was read ended up stored
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty() && self.chunks_stored == self.files_read
    }
}
