//! Literature search tool: embed a query and fetch the nearest articles.

use async_trait::async_trait;
use neurocite_core::error::ToolError;
use neurocite_core::evidence::EvidenceChunk;
use neurocite_core::retrieval::{DocumentStore, Embedder, Neighbor, VectorIndex};
use neurocite_core::tool::{Tool, ToolOutput};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "retrieve_context";

/// Ids the vector index uses for empty slots; never real articles.
const PLACEHOLDER_IDS: [&str; 3] = ["", "0", "null"];

/// Embeds the query, searches the literature index and resolves each hit
/// to its title and text.
pub struct RetrieveContextTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    top_k: usize,
    max_snippet_chars: usize,
}

impl RetrieveContextTool {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            documents,
            top_k: 5,
            max_snippet_chars: 15_000,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_max_snippet_chars(mut self, max_snippet_chars: usize) -> Self {
        self.max_snippet_chars = max_snippet_chars;
        self
    }
}

/// Drop placeholder ids and keep each real id once, at its best distance.
/// Output is sorted by ascending distance.
fn clean_neighbors(neighbors: Vec<Neighbor>) -> Vec<Neighbor> {
    let mut best: Vec<Neighbor> = Vec::with_capacity(neighbors.len());
    for n in neighbors {
        let id = n.id.trim();
        if PLACEHOLDER_IDS.contains(&id.to_ascii_lowercase().as_str()) {
            continue;
        }
        match best.iter_mut().find(|b| b.id == id) {
            Some(existing) if n.distance < existing.distance => existing.distance = n.distance,
            Some(_) => {}
            None => best.push(Neighbor {
                id: id.to_string(),
                distance: n.distance,
            }),
        }
    }
    best.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    best
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// `"3 docs retrieved: PMIDs 1, 2, 3 | best distance 0.41"`
pub fn summarize_chunks(chunks: &[EvidenceChunk]) -> String {
    if chunks.is_empty() {
        return "0 docs retrieved".to_string();
    }
    let pmids: Vec<&str> = chunks.iter().map(|c| c.pmid.as_str()).collect();
    let best = chunks
        .iter()
        .map(|c| c.distance)
        .fold(f32::INFINITY, f32::min);
    format!(
        "{} docs retrieved: PMIDs {} | best distance {:.2}",
        chunks.len(),
        pmids.join(", "),
        best
    )
}

#[async_trait]
impl Tool for RetrieveContextTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Semantic search over indexed neuroscience literature (PubMed abstracts and articles). \
         Use precise technical terminology. Returns the most similar articles with their PMIDs, \
         titles, excerpts and distances (smaller is more relevant)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query, ideally one of the expanded technical queries"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool_name: NAME.into(),
                reason: "missing 'query'".into(),
            })?;

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ToolError::from_retrieval(NAME, e))?;

        let neighbors = self
            .index
            .nearest(&vector, self.top_k)
            .await
            .map_err(|e| ToolError::from_retrieval(NAME, e))?;

        let neighbors = clean_neighbors(neighbors);
        debug!(query, hits = neighbors.len(), "Nearest neighbours");

        let mut chunks = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let document = self
                .documents
                .document(&neighbor.id)
                .await
                .map_err(|e| ToolError::from_retrieval(NAME, e))?;

            let Some(document) = document else {
                warn!(pmid = %neighbor.id, "Index returned an id with no document; skipping");
                continue;
            };

            chunks.push(EvidenceChunk {
                pmid: neighbor.id,
                title: document.title,
                snippet: truncate_chars(&document.text, self.max_snippet_chars),
                distance: neighbor.distance,
                query: query.to_string(),
            });
        }

        Ok(ToolOutput {
            summary: summarize_chunks(&chunks),
            chunks,
            facts: Vec::new(),
        })
    }
}
