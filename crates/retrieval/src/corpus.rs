//! JSON-lines literature corpus.
//!
//! Each line is one article with its precomputed embedding:
//!
//! ```text
//! {"pmid": "31234567", "title": "...", "text": "...", "embedding": [0.01, ...]}
//! ```
//!
//! The whole file is loaded once and served from memory. The corpus is
//! read-only; building it is an offline job.

use crate::vector;
use async_trait::async_trait;
use neurocite_core::error::RetrievalError;
use neurocite_core::retrieval::{Document, DocumentStore, Neighbor, VectorIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// One article in the corpus file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub pmid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub embedding: Vec<f32>,
}

/// In-memory corpus serving both nearest-neighbour search and document lookup.
pub struct JsonlCorpus {
    records: Vec<CorpusRecord>,
    by_pmid: HashMap<String, usize>,
    dimension: usize,
}

impl JsonlCorpus {
    /// Load a corpus file. Corrupt lines and records whose embedding
    /// dimension disagrees with the first record are skipped with a warning.
    pub fn open(path: &Path) -> Result<Self, RetrievalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Storage(format!("Failed to read corpus {}: {e}", path.display()))
        })?;

        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<CorpusRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping corrupted corpus record");
                    None
                }
            });

        let corpus = Self::from_records(records);
        debug!(path = %path.display(), count = corpus.len(), dimension = corpus.dimension, "Corpus loaded");
        Ok(corpus)
    }

    /// Build a corpus from records already in memory.
    pub fn from_records(records: impl IntoIterator<Item = CorpusRecord>) -> Self {
        let mut kept: Vec<CorpusRecord> = Vec::new();
        let mut by_pmid = HashMap::new();
        let mut dimension = 0;

        for record in records {
            if record.embedding.is_empty() {
                warn!(pmid = %record.pmid, "Skipping corpus record without embedding");
                continue;
            }
            if dimension == 0 {
                dimension = record.embedding.len();
            } else if record.embedding.len() != dimension {
                warn!(
                    pmid = %record.pmid,
                    expected = dimension,
                    got = record.embedding.len(),
                    "Skipping corpus record with mismatched embedding dimension"
                );
                continue;
            }
            if by_pmid.contains_key(&record.pmid) {
                warn!(pmid = %record.pmid, "Duplicate PMID in corpus; keeping the first record");
                continue;
            }
            by_pmid.insert(record.pmid.clone(), kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            by_pmid,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension shared by every record (0 for an empty corpus).
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl VectorIndex for JsonlCorpus {
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, RetrievalError> {
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(RetrievalError::SearchFailed(format!(
                "query has dimension {}, corpus has {}",
                vector.len(),
                self.dimension
            )));
        }

        let hits = vector::k_nearest(
            vector,
            self.records.iter().map(|r| r.embedding.as_slice()),
            k,
        );

        Ok(hits
            .into_iter()
            .map(|(i, distance)| Neighbor {
                id: self.records[i].pmid.clone(),
                distance,
            })
            .collect())
    }
}

#[async_trait]
impl DocumentStore for JsonlCorpus {
    async fn document(&self, id: &str) -> Result<Option<Document>, RetrievalError> {
        Ok(self.by_pmid.get(id).map(|&i| {
            let record = &self.records[i];
            Document {
                title: record.title.clone(),
                text: record.text.clone(),
            }
        }))
    }
}
