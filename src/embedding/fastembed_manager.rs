use super::{EmbeddingProvider, check_dimension};
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// FastEmbed-based local embedding provider
pub struct FastEmbedManager {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedManager {
    /// Create a manager with BGE base (768 dimensions, matching the default collection)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(EmbeddingModel::BGEBaseENV15, "BAAI/bge-base-en-v1.5")
    }

    /// Map a configured model name onto a fastembed model
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        let model = match name {
            "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
            other => {
                return Err(EmbeddingError::InitializationFailed(format!(
                    "unsupported local model '{}'",
                    other
                )));
            }
        };
        Self::with_model(model, name)
    }

    fn with_model(model: EmbeddingModel, name: &str) -> Result<Self, EmbeddingError> {
        tracing::info!("Initializing FastEmbed model: {:?}", model);

        let dimension = match model {
            EmbeddingModel::BGEBaseENV15 => 768,
            _ => 384,
        };

        let options = InitOptions::new(model).with_show_download_progress(true);
        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            model: Arc::new(Mutex::new(embedding_model)),
            model_name: name.to_string(),
            dimension,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FastEmbedManager {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let texts = vec![text.to_string()];

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| EmbeddingError::RequestFailed(format!("model lock poisoned: {e}")))?;
            guard
                .embed(texts, None)
                .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::RequestFailed(format!("embedding task failed: {e}")))??;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or(EmbeddingError::EmptyResponse)?;
        check_dimension(self.dimension, &embedding)?;
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
