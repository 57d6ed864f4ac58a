//! Evidence-gathering tools for the NeuroCite agent.
//!
//! Two tools are exposed to the hop-reasoning model:
//! - `retrieve_context`: semantic literature search
//! - `lookup_structured_data`: compound/target potency records

pub mod lookup_structured_data;
pub mod retrieve_context;

use neurocite_core::retrieval::{DocumentStore, Embedder, StructuredStore, VectorIndex};
use neurocite_core::tool::ToolRegistry;
use std::sync::Arc;

pub use lookup_structured_data::LookupStructuredDataTool;
pub use retrieve_context::RetrieveContextTool;

/// The read-only collaborators the tools delegate to.
#[derive(Clone)]
pub struct KnowledgeSources {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub documents: Arc<dyn DocumentStore>,
    pub structured: Arc<dyn StructuredStore>,
}

/// Tuning knobs for the tools.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub top_k: usize,
    pub max_snippet_chars: usize,
    pub lookup_limit: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_snippet_chars: 15_000,
            lookup_limit: 10,
        }
    }
}

/// Create a registry with both evidence tools wired to `sources`.
pub fn default_registry(sources: &KnowledgeSources, settings: &ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(
        RetrieveContextTool::new(
            sources.embedder.clone(),
            sources.index.clone(),
            sources.documents.clone(),
        )
        .with_top_k(settings.top_k)
        .with_max_snippet_chars(settings.max_snippet_chars),
    ));
    registry.register(Box::new(
        LookupStructuredDataTool::new(sources.structured.clone()).with_limit(settings.lookup_limit),
    ));
    registry
}
