//! # NeuroCite Core
//!
//! Domain types, traits, and error definitions for the NeuroCite
//! question-answering pipeline. No HTTP, storage or model code lives here:
//! it defines the evidence model, the answer shape and the collaborator
//! traits that every other crate implements against.
//!
//! ## Layout
//!
//! - [`provider`]: chat/embedding model abstraction
//! - [`retrieval`]: nearest-neighbour search, document and structured lookups
//! - [`tool`]: schema-typed tools and the registry the agent dispatches through
//! - [`evidence`]: evidence chunks, structured facts and the per-request pool
//! - [`answer`]: hops, confidence verdicts and the final answer
//! - [`event`]: progress events published while a question is answered

pub mod answer;
pub mod error;
pub mod event;
pub mod evidence;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use answer::{Answer, CitedPaper, ConfidenceVerdict, Hop};
pub use error::{Error, Result};
pub use event::{AgentEvent, EventBus};
pub use evidence::{EvidenceChunk, EvidencePool, StructuredFact};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{Document, DocumentStore, Embedder, Neighbor, StructuredStore, VectorIndex};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry};
