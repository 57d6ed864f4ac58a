//! In-memory compound store: useful for testing and demos.

use async_trait::async_trait;
use neurocite_core::error::RetrievalError;
use neurocite_core::evidence::StructuredFact;
use neurocite_core::retrieval::StructuredStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A structured store that keeps potency records in a Vec.
///
/// Matches the SQLite store's semantics: case-insensitive substring on the
/// entity name, ordered by name, limited.
pub struct InMemoryStructuredStore {
    facts: Arc<RwLock<Vec<StructuredFact>>>,
}

impl InMemoryStructuredStore {
    pub fn new() -> Self {
        Self {
            facts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_facts(facts: Vec<StructuredFact>) -> Self {
        Self {
            facts: Arc::new(RwLock::new(facts)),
        }
    }

    pub async fn insert(&self, fact: StructuredFact) {
        self.facts.write().await.push(fact);
    }
}

impl Default for InMemoryStructuredStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StructuredStore for InMemoryStructuredStore {
    async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<StructuredFact>, RetrievalError> {
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let facts = self.facts.read().await;
        let mut hits: Vec<StructuredFact> = facts
            .iter()
            .filter(|f| f.entity.to_uppercase().contains(&needle))
            .cloned()
            .collect();

        // Stable sort keeps insertion order among equal names.
        hits.sort_by(|a, b| a.entity.cmp(&b.entity));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(entity: &str) -> StructuredFact {
        StructuredFact {
            entity: entity.into(),
            target: "ACHE".into(),
            potency: Some(10.0),
            units: Some("nM".into()),
            uniprot_id: None,
            source_pmid: None,
        }
    }

    #[tokio::test]
    async fn substring_match_ignores_case() {
        let store = InMemoryStructuredStore::with_facts(vec![fact("DONEPEZIL"), fact("RIVASTIGMINE")]);
        let hits = store.lookup("Stigmine", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, "RIVASTIGMINE");
    }

    #[tokio::test]
    async fn ordered_and_limited() {
        let store = InMemoryStructuredStore::new();
        store.insert(fact("C-DRUG")).await;
        store.insert(fact("A-DRUG")).await;
        store.insert(fact("B-DRUG")).await;
        let hits = store.lookup("drug", 2).await.unwrap();
        let names: Vec<_> = hits.iter().map(|f| f.entity.as_str()).collect();
        assert_eq!(names, vec!["A-DRUG", "B-DRUG"]);
    }

    #[tokio::test]
    async fn blank_query_matches_nothing() {
        let store = InMemoryStructuredStore::with_facts(vec![fact("DONEPEZIL")]);
        assert!(store.lookup("  ", 10).await.unwrap().is_empty());
    }
}
