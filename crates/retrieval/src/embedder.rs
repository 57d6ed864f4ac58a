//! Adapts an embedding-capable [`Provider`] to the [`Embedder`] trait.

use async_trait::async_trait;
use neurocite_core::error::RetrievalError;
use neurocite_core::provider::{EmbeddingRequest, Provider};
use neurocite_core::retrieval::Embedder;
use std::sync::Arc;

/// Embeds query text through a provider's `/embeddings` endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RetrievalError::EmbeddingFailed("provider returned no embedding".into()))
    }
}
