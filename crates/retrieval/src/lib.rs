//! Read-only knowledge sources for NeuroCite.
//!
//! - [`corpus`]: JSON-lines literature corpus (nearest-neighbour search and document lookup)
//! - [`sqlite`]: compound potency warehouse backed by SQLite
//! - [`in_memory`]: compound store held in a `Vec`, for tests and demos
//! - [`embedder`]: adapts any embedding-capable `Provider` to the `Embedder` trait
//! - [`vector`]: distance functions

pub mod corpus;
pub mod embedder;
pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod vector;

pub use corpus::{CorpusRecord, JsonlCorpus};
pub use embedder::ProviderEmbedder;
pub use in_memory::InMemoryStructuredStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStructuredStore;
