//! Query expansion: one casual question in, several technical search queries out.

use neurocite_core::message::Message;
use neurocite_core::provider::{Provider, ProviderRequest};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// The outcome of expanding a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// 1..=N search queries, in the order the model gave them.
    pub queries: Vec<String>,
    /// Set when the raw question is used because expansion failed.
    pub fell_back: bool,
    /// Why expansion failed, if it did.
    pub reason: Option<String>,
}

impl Expansion {
    fn fallback(question: &str, reason: String) -> Self {
        Self {
            queries: vec![question.to_string()],
            fell_back: true,
            reason: Some(reason),
        }
    }
}

/// Rewrites a question into domain terminology (MeSH terms, gene and
/// pathway names, accepted synonyms) using a language model.
pub struct QueryExpander {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    count: usize,
}

impl QueryExpander {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            count: 3,
        }
    }

    /// Number of reformulations to ask for.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn prompt(&self, question: &str) -> String {
        format!(
            "You are a biomedical search expert.\n\
             Rewrite this research question into {n} alternative versions using:\n\
             - Technical/scientific terminology (MeSH terms, gene names, pathway names)\n\
             - Synonyms used in academic papers\n\
             - Related biological concepts\n\
             Keep the intent of the question unchanged.\n\
             Return ONLY a JSON array of {n} strings. No explanation, no markdown.\n\
             Question: \"{question}\"",
            n = self.count
        )
    }

    /// Expand `question`. Never fails: any problem yields the question itself.
    pub async fn expand(&self, question: &str) -> Expansion {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::user(self.prompt(question))],
            self.temperature,
        );

        let response = match self.provider.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Query expansion unavailable; using the raw question");
                return Expansion::fallback(question, e.to_string());
            }
        };

        match parse_expansions(&response.message.content, self.count) {
            Some(queries) => {
                debug!(?queries, "Question expanded");
                Expansion {
                    queries,
                    fell_back: false,
                    reason: None,
                }
            }
            None => {
                warn!(raw = %response.message.content, "Unusable expansion response; using the raw question");
                Expansion::fallback(question, "unusable expansion response".into())
            }
        }
    }
}

/// Parse a model reply that should be a JSON array of strings.
///
/// Tolerates Markdown code fences and prose around the array. Entries are
/// trimmed, blanks and case-insensitive duplicates dropped, and the list cut
/// to `count`. Returns `None` when nothing usable remains.
pub fn parse_expansions(raw: &str, count: usize) -> Option<Vec<String>> {
    let text = raw.trim().replace("```json", "").replace("```", "");
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(&text[start..=end]).ok()?;

    let mut seen = HashSet::new();
    let queries: Vec<String> = values
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(count)
        .map(String::from)
        .collect();

    (!queries.is_empty()).then_some(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};

    #[test]
    fn parses_plain_array() {
        let parsed = parse_expansions(r#"["a", "b", "c"]"#, 3).unwrap();
        assert_eq!(parsed, vec!["a", "b", "c"]);
    }

    #[test]
    fn parses_fenced_array_and_truncates() {
        let raw = "```json\n[\"protein aggregation\", \"amyloid\", \"tau\", \"synuclein\"]\n```";
        let parsed = parse_expansions(raw, 3).unwrap();
        assert_eq!(parsed, vec!["protein aggregation", "amyloid", "tau"]);
    }

    #[test]
    fn drops_blanks_duplicates_and_non_strings() {
        let raw = r#"["Tau", " ", "tau", 42, "  neurofibrillary tangles "]"#;
        let parsed = parse_expansions(raw, 3).unwrap();
        assert_eq!(parsed, vec!["Tau", "neurofibrillary tangles"]);
    }

    #[test]
    fn unusable_responses() {
        assert_eq!(parse_expansions("I cannot help with that", 3), None);
        assert_eq!(parse_expansions("[]", 3), None);
        assert_eq!(parse_expansions(r#"["", "  "]"#, 3), None);
        assert_eq!(parse_expansions("{\"a\": 1}", 3), None);
    }

    #[tokio::test]
    async fn expands_via_provider() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"["neuronal protein aggregation neurotoxicity", "amyloid oligomer cytotoxicity", "alpha-synuclein fibrils"]"#,
        ));
        let expander = QueryExpander::new(provider.clone(), "mock-model");
        let expansion = expander.expand("sticky protein clumps kill neurons").await;
        assert!(!expansion.fell_back);
        assert_eq!(expansion.queries.len(), 3);
        assert!(expansion.queries[0].contains("aggregation"));

        let request = &provider.requests()[0];
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert!(request.tools.is_empty());
        assert!(request.messages[0].content.contains("sticky protein clumps"));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_question() {
        let expander = QueryExpander::new(Arc::new(FailingProvider::network()), "m");
        let expansion = expander.expand("what causes ALS?").await;
        assert!(expansion.fell_back);
        assert_eq!(expansion.queries, vec!["what causes ALS?"]);
        assert!(expansion.reason.is_some());
    }

    #[tokio::test]
    async fn garbage_falls_back_to_question() {
        let expander = QueryExpander::new(
            Arc::new(SequentialMockProvider::single_text("Sure! Here are some ideas.")),
            "m",
        );
        let expansion = expander.expand("what causes ALS?").await;
        assert!(expansion.fell_back);
        assert_eq!(expansion.queries, vec!["what causes ALS?"]);
    }

    #[tokio::test]
    async fn count_is_respected() {
        let expander = QueryExpander::new(
            Arc::new(SequentialMockProvider::single_text(r#"["a", "b", "c"]"#)),
            "m",
        )
        .with_count(1);
        assert_eq!(expander.expand("q").await.queries, vec!["a"]);
    }
}
