//! Core library client for codebase-ai
//!
//! Wires the repository fetcher, chunk extractor, embedding provider and
//! vector store into the ingestion pipeline, and hands out query sessions.

use crate::chat::ChatSession;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{CodebaseError, Result};
use crate::git::RepositoryFetcher;
use crate::indexer::{ChunkExtractor, CodeChunk};
use crate::llm::LlmProvider;
use crate::types::IngestReport;
use crate::vector_db::{EmbeddedChunk, MilvusClient, VectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main client for ingesting a codebase and querying it
///
/// # Example
///
/// ```no_run
/// use codebase_ai::{CodebaseClient, Config};
///
/// # async fn example() -> codebase_ai::Result<()> {
/// let client = CodebaseClient::from_config(Config::new(None)?)?;
/// let report = client.ingest_directory("/path/to/repo").await?;
/// println!("Stored {} chunks", report.chunks_stored);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CodebaseClient {
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) store: Arc<dyn VectorStore>,
    pub(crate) config: Arc<Config>,
}

impl CodebaseClient {
    /// Build the configured embedding provider and a Milvus connection
    pub fn from_config(config: Config) -> Result<Self> {
        tracing::debug!("Embedding provider: {}", config.embedding.provider);
        tracing::debug!("Embedding model: {}", config.embedding.model);

        let embedder = embedding::from_config(&config.embedding)?;
        let store: Arc<dyn VectorStore> = Arc::new(MilvusClient::new(&config.milvus)?);
        Ok(Self::with_backends(config, embedder, store))
    }

    /// Use explicit backends (tests, benchmarks, alternative stores)
    pub fn with_backends(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedder)
    }

    pub fn collection(&self) -> &str {
        &self.config.milvus.collection_name
    }

    /// Create the collection for the embedder's dimension unless it exists
    pub async fn prepare_collection(&self) -> Result<()> {
        self.store
            .ensure_collection(self.collection(), self.embedder.dimension())
            .await?;
        Ok(())
    }

    /// Clone `url` and ingest the checkout.
    ///
    /// The clone lands in `ingest.clone_dir` when configured; otherwise it
    /// goes to a temporary directory removed once ingestion finishes.
    pub async fn ingest_repository(&self, url: &str) -> Result<IngestReport> {
        tracing::info!("Cloning {}", url);
        let checkout =
            RepositoryFetcher::checkout(url, self.config.ingest.clone_dir.as_deref()).await?;
        let report = self.ingest_directory(checkout.path()).await?;

        if checkout.is_temporary() {
            tracing::debug!("Removing temporary checkout {}", checkout.path().display());
        }
        drop(checkout);
        Ok(report)
    }

    /// Chunk, embed and store every matching file under `root`
    pub async fn ingest_directory(&self, root: impl AsRef<Path>) -> Result<IngestReport> {
        let start = Instant::now();
        let root = root.as_ref();
        let ingest = &self.config.ingest;

        let extractor = ChunkExtractor::new(root, &ingest.extensions)
            .with_exclude_patterns(ingest.exclude_patterns.clone())
            .with_max_file_size(ingest.max_file_size);
        // A bad root fails before the collection is touched
        let mut chunks = extractor.chunks()?;

        self.prepare_collection().await?;

        tracing::info!("Ingesting {} into '{}'", root.display(), self.collection());

        let mut report = IngestReport {
            collection: self.collection().to_string(),
            ..IngestReport::default()
        };
        let batch_size = ingest.insert_batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);

        for chunk in chunks.by_ref() {
            report.files_read += 1;

            match self.embed_chunk(chunk).await {
                Ok(embedded) => {
                    report.chunks_embedded += 1;
                    batch.push(embedded);
                }
                Err((path, e)) => {
                    tracing::warn!("Skipping {}: {}", path, e);
                    report.failed_chunks.push(format!("{}: {}", path, e));
                    continue;
                }
            }

            if batch.len() >= batch_size {
                report.chunks_stored += self.flush(&mut batch).await?;
            }
        }
        report.chunks_stored += self.flush(&mut batch).await?;

        report.skipped_files = chunks
            .into_skipped()
            .into_iter()
            .map(|s| format!("{}: {}", s.path.display(), s.error))
            .collect();
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Stored {} of {} chunks in {} ms ({} files skipped, {} embeddings failed)",
            report.chunks_stored,
            report.files_read,
            report.duration_ms,
            report.skipped_files.len(),
            report.failed_chunks.len()
        );

        Ok(report)
    }

    /// Embed one chunk; failures are reported with the chunk's path
    async fn embed_chunk(
        &self,
        chunk: CodeChunk,
    ) -> std::result::Result<EmbeddedChunk, (String, CodebaseError)> {
        match self.embedder.embed(&chunk.content).await {
            Ok(embedding) => Ok(EmbeddedChunk {
                path: chunk.relative_path,
                content: chunk.content,
                content_hash: chunk.hash,
                embedding,
            }),
            Err(e) => Err((chunk.relative_path, e.into())),
        }
    }

    async fn flush(&self, batch: &mut Vec<EmbeddedChunk>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let rows = std::mem::take(batch);
        tracing::debug!("Flushing {} rows", rows.len());
        Ok(self.store.insert(self.collection(), rows).await?)
    }

    /// Question loop over this client's collection
    pub fn chat_session(&self, llm: Arc<dyn LlmProvider>) -> ChatSession {
        ChatSession::new(
            self.embedder(),
            self.store(),
            llm,
            self.collection(),
            &self.config.query,
        )
    }
}
