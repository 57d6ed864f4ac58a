//! The question-answering agent.
//!
//! A question passes through four stages:
//!
//! 1. **Expand** the casual question into technical search queries
//! 2. **Hop**: a reasoner picks one tool per hop (literature search or
//!    structured lookup) until it has enough evidence or the hop limit hits
//! 3. **Grade** the evidence by its best retrieval distance
//! 4. **Synthesize** a cited answer, or an honest insufficient-evidence
//!    statement when the evidence is weak
//!
//! Collaborator failures degrade the answer instead of failing the request.

pub mod citation;
pub mod confidence;
pub mod expander;
pub mod orchestrator;
pub mod reasoner;
pub mod synthesizer;

#[cfg(test)]
mod test_helpers;

pub use citation::{CitationTracker, Citations};
pub use confidence::ConfidenceEvaluator;
pub use expander::{Expansion, QueryExpander};
pub use orchestrator::{Agent, AgentLimits, AgentState, Degradation, MAX_QUESTION_CHARS, RequestContext};
pub use reasoner::{LlmReasoner, NextAction, Reasoner, ReasoningInput};
pub use synthesizer::{INSUFFICIENT_EVIDENCE, ResponseSynthesizer, Synthesis, SynthesisMode};
