//! Collaborator traits for the read-only knowledge sources.
//!
//! The pipeline never builds an index or writes to the warehouse; it only
//! consumes these four capabilities:
//! - [`Embedder`]: text → vector
//! - [`VectorIndex`]: vector, k → nearest document ids with distances
//! - [`DocumentStore`]: document id → title and text
//! - [`StructuredStore`]: name → compound/target potency records

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;
use crate::evidence::StructuredFact;

/// A nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    /// Distance to the query vector, smaller is closer.
    pub distance: f32,
}

/// A literature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub text: String,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` nearest ids, closest first.
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, RetrievalError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the id is unknown.
    async fn document(&self, id: &str) -> Result<Option<Document>, RetrievalError>;
}

#[async_trait]
pub trait StructuredStore: Send + Sync {
    /// Records whose entity matches `query`; empty when nothing matches.
    async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<StructuredFact>, RetrievalError>;
}
