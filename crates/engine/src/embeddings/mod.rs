//! Embedding providers for the semantic retriever.
//!
//! Providers sit behind one trait so the retriever never observes which
//! backend is active. Selection happens once at construction via a capability
//! probe: the `ollama` provider verifies its endpoint and degrades to the
//! deterministic `hash` provider on any failure.

pub mod hash;
pub mod ollama;

pub use hash::HashProvider;
pub use ollama::OllamaProvider;

use prism_core::config::EmbeddingSettings;
use prism_core::PrismResult;
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "hash", "ollama")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate unit-normalized embeddings for multiple texts in input order.
    async fn embed_batch(&self, texts: &[String]) -> PrismResult<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> PrismResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| {
            prism_core::PrismError::Embedding("No embedding returned".to_string())
        })
    }
}

/// Create an embedding provider from configuration.
///
/// The `ollama` provider is probed at construction; if it is unreachable the
/// engine keeps working on `hash` embeddings and logs a degraded-mode notice.
/// The probe is the only place backend availability is observable.
pub async fn create_provider(
    settings: &EmbeddingSettings,
) -> PrismResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "hash" => Ok(Arc::new(HashProvider::new(settings.dimensions))),

        "ollama" => match OllamaProvider::new(settings).await {
            Ok(provider) => Ok(Arc::new(provider)),
            Err(e) => {
                tracing::warn!(
                    "Ollama embedding provider unavailable ({}); degrading to deterministic hash embeddings",
                    e
                );
                Ok(Arc::new(HashProvider::new(settings.dimensions)))
            }
        },

        other => Err(prism_core::PrismError::Embedding(format!(
            "Unknown embedding provider: '{}'. Supported providers: hash, ollama",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            provider: "hash".to_string(),
            model: "hash-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }

    #[tokio::test]
    async fn test_create_hash_provider() {
        let provider = create_provider(&hash_settings()).await.unwrap();
        assert_eq!(provider.provider_name(), "hash");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let mut settings = hash_settings();
        settings.provider = "word2vec".to_string();

        let result = create_provider(&settings).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_unreachable_ollama_degrades_to_hash() {
        let settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 384,
            // Nothing listens here; the probe must fail fast and degrade
            endpoint: Some("http://127.0.0.1:9".to_string()),
        };

        let provider = create_provider(&settings).await.unwrap();
        assert_eq!(provider.provider_name(), "hash");
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&hash_settings()).await.unwrap();
        let embedding = provider.embed("activation rate dropped").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
