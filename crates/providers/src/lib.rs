//! Language-model providers for NeuroCite.
//!
//! All providers implement the `neurocite_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
