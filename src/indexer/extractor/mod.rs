//! Lazy extraction of code chunks from a directory tree

use super::CodeChunk;
use crate::config::MAX_PATH_LENGTH;
use crate::error::IndexingError;
use ignore::{Walk, WalkBuilder};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// A file that could not be turned into a chunk
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: IndexingError,
}

/// Walks a directory and yields one [`CodeChunk`] per matching source file
pub struct ChunkExtractor {
    pub(crate) root: PathBuf,
    pub(crate) extensions: Vec<String>,
    pub(crate) exclude_patterns: Vec<String>,
    pub(crate) max_file_size: u64,
    pub(crate) max_path_length: usize,
}

impl ChunkExtractor {
    /// Extensions may be given with or without the leading dot
    pub fn new(root: impl AsRef<Path>, extensions: &[String]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            exclude_patterns: vec![],
            max_file_size: u64::MAX,
            max_path_length: MAX_PATH_LENGTH,
        }
    }

    /// Skip any file with a path component equal to one of `patterns`
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Longest relative path, in bytes, that can be stored with its chunk
    pub fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }

    /// Start a walk over the root directory
    ///
    /// Files are read lazily as the returned iterator advances. Entries are
    /// visited in file-name order within each directory.
    pub fn chunks(&self) -> Result<Chunks, IndexingError> {
        if !self.root.exists() {
            return Err(IndexingError::DirectoryNotFound(
                self.root.display().to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(IndexingError::NotADirectory(
                self.root.display().to_string(),
            ));
        }

        // Every file under the root is visited; ignore files on disk or in the
        // user's git config do not change what gets ingested
        let walk = WalkBuilder::new(&self.root)
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        Ok(Chunks {
            walk,
            root: self.root.clone(),
            extensions: self.extensions.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            max_file_size: self.max_file_size,
            max_path_length: self.max_path_length,
            skipped: Vec::new(),
        })
    }

    pub(crate) fn matches_extension(extensions: &[String], path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    pub(crate) fn is_excluded(patterns: &[String], relative: &Path) -> bool {
        relative.components().any(|c| {
            let component = c.as_os_str().to_string_lossy();
            patterns.iter().any(|p| p == component.as_ref())
        })
    }
}

/// Lazy sequence of chunks produced by [`ChunkExtractor::chunks`]
///
/// Files that fail to read are logged, recorded in [`Chunks::skipped`], and
/// do not interrupt the walk.
pub struct Chunks {
    walk: Walk,
    root: PathBuf,
    extensions: Vec<String>,
    exclude_patterns: Vec<String>,
    max_file_size: u64,
    max_path_length: usize,
    skipped: Vec<SkippedFile>,
}

impl Chunks {
    /// Files skipped so far
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn into_skipped(self) -> Vec<SkippedFile> {
        self.skipped
    }

    fn skip(&mut self, path: &Path, error: IndexingError) {
        tracing::warn!("Skipping {}: {}", path.display(), error);
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            error,
        });
    }

    fn read_chunk(&self, path: &Path, relative: &Path) -> Result<Option<CodeChunk>, IndexingError> {
        let read_failed = |reason: String| IndexingError::FileReadFailed {
            file: path.display().to_string(),
            reason,
        };

        let relative_path = relative.to_string_lossy().to_string();
        if relative_path.len() > self.max_path_length {
            return Err(IndexingError::PathTooLong {
                len: relative_path.len(),
                max: self.max_path_length,
            });
        }

        let metadata = fs::metadata(path).map_err(|e| read_failed(e.to_string()))?;
        if metadata.len() > self.max_file_size {
            return Err(IndexingError::FileTooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }

        let bytes = fs::read(path).map_err(|e| read_failed(e.to_string()))?;
        if bytes.is_empty() {
            tracing::debug!("Skipping empty file: {}", path.display());
            return Ok(None);
        }
        if !is_text(&bytes) {
            return Err(IndexingError::BinaryFile(path.display().to_string()));
        }

        let content = String::from_utf8(bytes)
            .map_err(|_| read_failed("file is not valid UTF-8".to_string()))?;

        Ok(Some(CodeChunk {
            path: path.to_path_buf(),
            relative_path,
            hash: calculate_hash(&content),
            content,
        }))
    }
}

impl Iterator for Chunks {
    type Item = CodeChunk;

    fn next(&mut self) -> Option<CodeChunk> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            if !ChunkExtractor::matches_extension(&self.extensions, &path) {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
            if ChunkExtractor::is_excluded(&self.exclude_patterns, &relative) {
                tracing::debug!("Excluded by pattern: {}", relative.display());
                continue;
            }

            match self.read_chunk(&path, &relative) {
                Ok(Some(chunk)) => return Some(chunk),
                Ok(None) => continue,
                Err(e) => self.skip(&path, e),
            }
        }
    }
}

/// Simple heuristic: if 30% or more of the bytes are control characters, it's binary
pub(crate) fn is_text(content: &[u8]) -> bool {
    if content.is_empty() {
        return true;
    }
    let non_printable = content
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    (non_printable as f64 / content.len() as f64) < 0.3
}

pub(crate) fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests;
