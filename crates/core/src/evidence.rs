//! Evidence gathered while answering one question.
//!
//! Two kinds of evidence flow into the pool:
//! - [`EvidenceChunk`]: a literature record found by semantic search, with the
//!   distance that produced it (lower = closer)
//! - [`StructuredFact`]: a compound/target potency record found by name
//!
//! The [`EvidencePool`] only ever grows during a request. Re-retrieving a
//! document keeps one entry per PMID, with the best distance seen.

use serde::{Deserialize, Serialize};

/// A literature record retrieved by semantic similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Document identifier (PubMed id).
    pub pmid: String,
    /// Display title.
    pub title: String,
    /// Retrieved text excerpt.
    pub snippet: String,
    /// Similarity distance, smaller is better.
    pub distance: f32,
    /// The query that retrieved this chunk.
    pub query: String,
}

/// A relational potency record, retrieved by entity name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredFact {
    /// Compound name as stored in the warehouse.
    pub entity: String,
    /// Target identifier (protein target name).
    pub target: String,
    /// Potency value (IC50), when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potency: Option<f64>,
    /// Units of `potency` (e.g. "nM").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniprot_id: Option<String>,
    /// Publication the measurement came from, if linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_pmid: Option<String>,
}

impl StructuredFact {
    /// `"DONEPEZIL → ACHE IC50=6.7 nM"`
    pub fn describe(&self) -> String {
        let potency = match (self.potency, &self.units) {
            (Some(value), Some(units)) => format!("IC50={value} {units}"),
            (Some(value), None) => format!("IC50={value}"),
            (None, _) => "IC50=n/a".to_string(),
        };
        format!("{} → {} {}", self.entity, self.target, potency)
    }
}

/// All evidence accumulated for one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidencePool {
    chunks: Vec<EvidenceChunk>,
    facts: Vec<StructuredFact>,
}

impl EvidencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge retrieved chunks. Returns how many new documents were added.
    pub fn add_chunks(&mut self, chunks: impl IntoIterator<Item = EvidenceChunk>) -> usize {
        let mut added = 0;
        for chunk in chunks {
            match self.chunks.iter_mut().find(|c| c.pmid == chunk.pmid) {
                Some(existing) => {
                    if chunk.distance < existing.distance {
                        existing.distance = chunk.distance;
                        existing.query = chunk.query;
                    }
                }
                None => {
                    self.chunks.push(chunk);
                    added += 1;
                }
            }
        }
        added
    }

    /// Merge structured facts, skipping exact duplicates. Returns how many were added.
    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = StructuredFact>) -> usize {
        let mut added = 0;
        for fact in facts {
            if !self.facts.contains(&fact) {
                self.facts.push(fact);
                added += 1;
            }
        }
        added
    }

    pub fn chunks(&self) -> &[EvidenceChunk] {
        &self.chunks
    }

    pub fn facts(&self) -> &[StructuredFact] {
        &self.facts
    }

    pub fn chunk(&self, pmid: &str) -> Option<&EvidenceChunk> {
        self.chunks.iter().find(|c| c.pmid == pmid)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.facts.is_empty()
    }

    /// Smallest distance among all chunks.
    pub fn best_distance(&self) -> Option<f32> {
        self.chunks
            .iter()
            .map(|c| c.distance)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Chunks within `threshold`, closest first.
    pub fn usable_chunks(&self, threshold: f32) -> Vec<&EvidenceChunk> {
        let mut usable: Vec<&EvidenceChunk> =
            self.chunks.iter().filter(|c| c.distance <= threshold).collect();
        usable.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        usable
    }

    /// Compact digest of the pool for the hop-reasoning prompt.
    pub fn summary(&self, snippet_chars: usize) -> String {
        if self.is_empty() {
            return "No evidence gathered yet.".to_string();
        }

        let mut out = String::new();
        if !self.chunks.is_empty() {
            out.push_str(&format!("Literature ({} documents):\n", self.chunks.len()));
            for c in &self.chunks {
                let excerpt: String = c.snippet.chars().take(snippet_chars).collect();
                out.push_str(&format!(
                    "- PMID {} (distance {:.3}): {}: {}\n",
                    c.pmid, c.distance, c.title, excerpt
                ));
            }
        }
        if !self.facts.is_empty() {
            out.push_str(&format!("Structured records ({}):\n", self.facts.len()));
            for f in &self.facts {
                out.push_str(&format!("- {}\n", f.describe()));
            }
        }
        out
    }
}
