#[cfg(feature = "local-embeddings")]
mod fastembed_manager;
mod openai;

#[cfg(feature = "local-embeddings")]
pub use fastembed_manager::FastEmbedManager;
pub use openai::OpenAiEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use std::sync::Arc;

/// Trait for embedding generation
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Convert one text unit into a vector of length [`dimension`](Self::dimension)
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the provider selected by `config.provider`
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::from_config(config)?)),
        #[cfg(feature = "local-embeddings")]
        "fastembed" => {
            let manager = FastEmbedManager::from_model_name(&config.model)?;
            if manager.dimension() != config.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: config.dimension,
                    actual: manager.dimension(),
                });
            }
            Ok(Arc::new(manager))
        }
        #[cfg(not(feature = "local-embeddings"))]
        "fastembed" => Err(EmbeddingError::InitializationFailed(
            "fastembed provider requires the `local-embeddings` feature".to_string(),
        )),
        other => Err(EmbeddingError::InitializationFailed(format!(
            "unknown embedding provider '{}'",
            other
        ))),
    }
}

/// Check a returned vector against the provider's advertised dimension
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
