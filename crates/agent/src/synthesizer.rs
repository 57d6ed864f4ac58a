//! Answer synthesis.
//!
//! Three paths:
//! - low confidence: a fixed insufficient-evidence statement, structured
//!   facts listed verbatim, suggested next steps, no papers cited;
//! - normal: a grounded answer generated from the usable evidence with
//!   inline citation markers, verified by [`CitationTracker`];
//! - model failure: an extractive answer built only from evidence snippets.

use crate::citation::CitationTracker;
use neurocite_core::answer::{CitedPaper, ConfidenceVerdict};
use neurocite_core::evidence::{EvidenceChunk, EvidencePool, StructuredFact};
use neurocite_core::message::Message;
use neurocite_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, warn};

pub const INSUFFICIENT_EVIDENCE: &str = "I don't have sufficient evidence in the indexed literature to answer this question reliably.";

/// Longest excerpt per document placed in the prompt.
const PROMPT_SNIPPET_CHARS: usize = 4_000;

const SYNTHESIS_PROMPT: &str = "You are a neuroscience research assistant. Answer the question using ONLY \
the evidence below. Cite every literature claim with its marker, e.g. [PMID:12345678], and every \
potency value with its record marker, e.g. [DATA:DONEPEZIL]. Never cite anything not listed. If the \
evidence only partly answers the question, say what is missing. Never fabricate.";

/// How the answer text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    Generated,
    Extractive,
    InsufficientEvidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub text: String,
    pub cited_papers: Vec<CitedPaper>,
    pub mode: SynthesisMode,
}

pub struct ResponseSynthesizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ResponseSynthesizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Produce the answer text for `question` from `pool`.
    ///
    /// Only chunks within `threshold` are shown to the model or eligible
    /// for citation.
    pub async fn synthesize(
        &self,
        question: &str,
        pool: &EvidencePool,
        verdict: ConfidenceVerdict,
        threshold: f32,
    ) -> Synthesis {
        let usable = pool.usable_chunks(threshold);
        if verdict.is_low() || usable.is_empty() {
            return insufficient_evidence(pool.facts());
        }

        let tracker = CitationTracker::new(usable.iter().copied(), pool.facts());

        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(SYNTHESIS_PROMPT),
                Message::user(self.render(question, &usable, pool.facts())),
            ],
            self.temperature,
        );
        request.max_tokens = self.max_tokens;

        match self.provider.complete(request).await {
            Ok(response) if !response.message.content.trim().is_empty() => {
                let citations = tracker.finalize(response.message.content.trim());
                if citations.papers.is_empty() && citations.data.is_empty() {
                    warn!("Synthesis model cited no verified evidence; falling back to extractive answer");
                    return self.extractive(&tracker, &usable, pool.facts());
                }
                debug!(cited = citations.papers.len(), "Answer generated");
                Synthesis {
                    text: citations.text,
                    cited_papers: citations.papers,
                    mode: SynthesisMode::Generated,
                }
            }
            Ok(_) => {
                warn!("Synthesis model returned an empty answer; falling back to extractive answer");
                self.extractive(&tracker, &usable, pool.facts())
            }
            Err(e) => {
                warn!(error = %e, "Synthesis model unavailable; falling back to extractive answer");
                self.extractive(&tracker, &usable, pool.facts())
            }
        }
    }

    fn render(&self, question: &str, chunks: &[&EvidenceChunk], facts: &[StructuredFact]) -> String {
        let mut out = format!("Question: {question}\n\nLiterature:\n");
        for c in chunks {
            let excerpt: String = c.snippet.chars().take(PROMPT_SNIPPET_CHARS).collect();
            out.push_str(&format!(
                "[PMID:{}] {} (distance {:.3})\n{}\n\n",
                c.pmid, c.title, c.distance, excerpt
            ));
        }
        if !facts.is_empty() {
            out.push_str("Structured records:\n");
            for f in facts {
                out.push_str(&format!("[DATA:{}] {}", f.entity, f.describe()));
                if let Some(pmid) = &f.source_pmid {
                    out.push_str(&format!(" (source PMID {pmid})"));
                }
                out.push('\n');
            }
        }
        out
    }

    /// Evidence-only answer: first sentence of each usable document and
    /// every structured record, each with its marker.
    fn extractive(
        &self,
        tracker: &CitationTracker<'_>,
        chunks: &[&EvidenceChunk],
        facts: &[StructuredFact],
    ) -> Synthesis {
        let mut text = String::from("Based on the retrieved evidence:\n");
        for c in chunks {
            text.push_str(&format!(
                "- {}: {} [PMID:{}]\n",
                c.title,
                first_sentence(&c.snippet, 300),
                c.pmid
            ));
        }
        for f in facts {
            text.push_str(&format!("- {} [DATA:{}]\n", f.describe(), f.entity));
        }

        let citations = tracker.finalize(text.trim_end());
        Synthesis {
            text: citations.text,
            cited_papers: citations.papers,
            mode: SynthesisMode::Extractive,
        }
    }
}

/// The low-confidence answer. Cites nothing.
pub fn insufficient_evidence(facts: &[StructuredFact]) -> Synthesis {
    let mut text = String::from(INSUFFICIENT_EVIDENCE);

    if !facts.is_empty() {
        text.push_str("\n\nStructured records found:\n");
        for f in facts {
            text.push_str(&format!("- {}\n", f.describe()));
        }
        text.truncate(text.trim_end().len());
    }

    text.push_str(
        "\n\nSuggested next steps:\n\
         - Search PubMed directly with specific gene, protein or pathway names\n\
         - Rephrase the question using established terminology\n\
         - Consult a recent review article or a domain expert",
    );

    Synthesis {
        text,
        cited_papers: Vec::new(),
        mode: SynthesisMode::InsufficientEvidence,
    }
}

/// Up to the first sentence end, capped at `max` characters.
fn first_sentence(text: &str, max: usize) -> String {
    let capped: String = text.trim().chars().take(max).collect();
    match capped.find(". ") {
        Some(end) => capped[..=end].to_string(),
        None => capped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider, donepezil_fact};

    fn pool() -> EvidencePool {
        let mut pool = EvidencePool::new();
        pool.add_chunks(vec![
            EvidenceChunk {
                pmid: "100".into(),
                title: "Amyloid oligomers are neurotoxic".into(),
                snippet: "Soluble amyloid-beta oligomers impair synapses. Further text.".into(),
                distance: 0.4,
                query: "amyloid".into(),
            },
            EvidenceChunk {
                pmid: "200".into(),
                title: "Unrelated cardiology paper".into(),
                snippet: "Heart.".into(),
                distance: 1.9,
                query: "amyloid".into(),
            },
        ]);
        pool.add_facts(vec![donepezil_fact()]);
        pool
    }

    #[tokio::test]
    async fn generated_answer_cites_only_verified_usable_docs() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            "Amyloid oligomers damage synapses [PMID:100]. Cardiac link [PMID:200]. Invented [PMID:300].",
        ));
        let synth = ResponseSynthesizer::new(provider.clone(), "m");
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Acceptable, 1.2).await;

        assert_eq!(s.mode, SynthesisMode::Generated);
        assert_eq!(s.cited_papers.len(), 1);
        assert_eq!(s.cited_papers[0].pmid, "100");
        assert!(!s.text.contains("300"));

        let prompt = &provider.requests()[0].messages[1].content;
        assert!(prompt.contains("[PMID:100]"));
        assert!(!prompt.contains("[PMID:200]"));
        assert!(prompt.contains("[DATA:DONEPEZIL]"));
    }

    #[tokio::test]
    async fn low_confidence_is_insufficient_evidence() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let synth = ResponseSynthesizer::new(provider.clone(), "m");
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Low, 1.2).await;

        assert_eq!(s.mode, SynthesisMode::InsufficientEvidence);
        assert!(s.text.starts_with(INSUFFICIENT_EVIDENCE));
        assert!(s.text.contains("DONEPEZIL → ACHE IC50=6.7 nM"));
        assert!(s.text.contains("Suggested next steps"));
        assert!(s.cited_papers.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_gives_extractive_answer() {
        let synth = ResponseSynthesizer::new(Arc::new(FailingProvider::network()), "m");
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Acceptable, 1.2).await;

        assert_eq!(s.mode, SynthesisMode::Extractive);
        assert!(s.text.contains("Soluble amyloid-beta oligomers impair synapses. [PMID:100]"));
        assert!(s.text.contains("[DATA:DONEPEZIL]"));
        assert_eq!(s.cited_papers.len(), 1);
        assert!(!s.text.contains("cardiology"));
    }

    #[tokio::test]
    async fn empty_model_answer_gives_extractive_answer() {
        let synth = ResponseSynthesizer::new(Arc::new(SequentialMockProvider::single_text("   ")), "m");
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Acceptable, 1.2).await;
        assert_eq!(s.mode, SynthesisMode::Extractive);
    }

    #[tokio::test]
    async fn answer_without_verified_citations_gives_extractive_answer() {
        let synth = ResponseSynthesizer::new(
            Arc::new(SequentialMockProvider::single_text("Aspirin cures ALS [PMID:999].")),
            "m",
        );
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Acceptable, 1.2).await;

        assert_eq!(s.mode, SynthesisMode::Extractive);
        assert!(!s.text.contains("Aspirin"));
        assert_eq!(s.cited_papers.len(), 1);
        assert_eq!(s.cited_papers[0].pmid, "100");
    }

    #[tokio::test]
    async fn data_only_citation_is_still_generated() {
        let synth = ResponseSynthesizer::new(
            Arc::new(SequentialMockProvider::single_text("IC50 is 6.7 nM [DATA:DONEPEZIL].")),
            "m",
        );
        let s = synth.synthesize("q", &pool(), ConfidenceVerdict::Acceptable, 1.2).await;
        assert_eq!(s.mode, SynthesisMode::Generated);
    }

    #[test]
    fn insufficient_without_facts() {
        let s = insufficient_evidence(&[]);
        assert!(!s.text.contains("Structured records"));
        assert!(s.cited_papers.is_empty());
    }

    #[test]
    fn first_sentence_cuts_at_period() {
        assert_eq!(first_sentence("One. Two.", 100), "One.");
        assert_eq!(first_sentence("No period here", 5), "No pe");
    }
}
