//! Shared test helpers: scripted providers, a scripted reasoner and a small
//! in-memory knowledge base.

use crate::reasoner::{NextAction, Reasoner, ReasoningInput};
use neurocite_core::error::{ProviderError, RetrievalError};
use neurocite_core::evidence::StructuredFact;
use neurocite_core::message::{Message, MessageToolCall};
use neurocite_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use neurocite_core::retrieval::{Embedder, StructuredStore};
use neurocite_core::tool::ToolRegistry;
use neurocite_retrieval::{CorpusRecord, InMemoryStructuredStore, JsonlCorpus};
use neurocite_tools::{KnowledgeSources, ToolSettings, default_registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longer than any request deadline used in tests.
const STALL: Duration = Duration::from_secs(3_600);

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();

        if count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                responses.len()
            );
        }

        requests.push(request);
        Ok(responses[count].clone())
    }
}

/// A provider whose every call fails.
pub struct FailingProvider {
    error: ProviderError,
}

impl FailingProvider {
    pub fn network() -> Self {
        Self {
            error: ProviderError::Network("connection refused".into()),
        }
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.error.clone())
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response carrying tool calls.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: None,
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Reasoner that plays back a fixed list of actions, then stops.
pub struct ScriptedReasoner {
    actions: Mutex<Vec<Result<NextAction, ProviderError>>>,
    inputs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedReasoner {
    pub fn new(actions: Vec<Result<NextAction, ProviderError>>) -> Self {
        Self {
            actions: Mutex::new(actions.into_iter().rev().collect()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Pending queries seen on each call, in call order.
    pub fn seen_pending_queries(&self) -> Vec<Vec<String>> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Reasoner for ScriptedReasoner {
    async fn next_action(&self, input: ReasoningInput<'_>) -> Result<NextAction, ProviderError> {
        self.inputs.lock().unwrap().push(input.pending_queries.to_vec());
        self.actions.lock().unwrap().pop().unwrap_or(Ok(NextAction::Stop))
    }
}

/// Reasoner that never stops asking for the same tool.
pub struct RelentlessReasoner {
    pub action: NextAction,
}

#[async_trait::async_trait]
impl Reasoner for RelentlessReasoner {
    async fn next_action(&self, _input: ReasoningInput<'_>) -> Result<NextAction, ProviderError> {
        Ok(self.action.clone())
    }
}

/// Reasoner that stalls far past any deadline.
pub struct StalledReasoner;

#[async_trait::async_trait]
impl Reasoner for StalledReasoner {
    async fn next_action(&self, _input: ReasoningInput<'_>) -> Result<NextAction, ProviderError> {
        tokio::time::sleep(STALL).await;
        Ok(NextAction::Stop)
    }
}

pub fn retrieve(query: &str) -> NextAction {
    NextAction::Continue {
        tool: "retrieve_context".into(),
        arguments: serde_json::json!({ "query": query }),
    }
}

pub fn lookup(entity: &str) -> NextAction {
    NextAction::Continue {
        tool: "lookup_structured_data".into(),
        arguments: serde_json::json!({ "entity_or_topic": entity }),
    }
}

/// Maps text to a vector by topic keywords, so tests control distances.
///
/// Aggregation topics land next to the aggregation papers, cholinesterase
/// topics next to the donepezil paper, everything else far from all papers.
pub struct KeywordEmbedder;

#[async_trait::async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let t = text.to_lowercase();
        Ok(if t.contains("aggregat") || t.contains("amyloid") {
            vec![1.0, 0.0, 0.0]
        } else if t.contains("cholinesterase") || t.contains("donepezil") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 3.0]
        })
    }
}

/// Embedder that is always down.
pub struct DownEmbedder;

#[async_trait::async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        Err(RetrievalError::Unreachable("embedding service returned 503".into()))
    }
}

/// Embedder that stalls far past any deadline.
pub struct StalledEmbedder;

#[async_trait::async_trait]
impl Embedder for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        tokio::time::sleep(STALL).await;
        Ok(vec![0.0, 0.0, 3.0])
    }
}

/// Structured store that is unreachable for its first `failures` calls.
pub struct FlakyStructuredStore {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyStructuredStore {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StructuredStore for FlakyStructuredStore {
    async fn lookup(&self, _query: &str, _limit: usize) -> Result<Vec<StructuredFact>, RetrievalError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RetrievalError::Unreachable("structured store connection reset".into()));
        }
        Ok(vec![donepezil_fact()])
    }
}

pub fn test_corpus() -> JsonlCorpus {
    let record = |pmid: &str, title: &str, text: &str, embedding: Vec<f32>| CorpusRecord {
        pmid: pmid.into(),
        title: title.into(),
        text: text.into(),
        embedding,
    };
    JsonlCorpus::from_records(vec![
        record(
            "31000001",
            "Protein aggregation and neuronal death",
            "Misfolded protein aggregates such as amyloid-beta oligomers are toxic to neurons.",
            vec![1.0, 0.0, 0.1],
        ),
        record(
            "31000002",
            "Alpha-synuclein fibrils in Parkinson's disease",
            "Alpha-synuclein aggregation into fibrils drives dopaminergic neuron loss.",
            vec![0.9, 0.1, 0.0],
        ),
        record(
            "31000003",
            "Donepezil and acetylcholinesterase inhibition",
            "Donepezil is a reversible acetylcholinesterase inhibitor used in Alzheimer's disease.",
            vec![0.0, 1.0, 0.0],
        ),
    ])
}

pub fn donepezil_fact() -> StructuredFact {
    StructuredFact {
        entity: "DONEPEZIL".into(),
        target: "ACHE".into(),
        potency: Some(6.7),
        units: Some("nM".into()),
        uniprot_id: Some("P22303".into()),
        source_pmid: Some("31000003".into()),
    }
}

pub fn knowledge_sources(embedder: Arc<dyn Embedder>) -> KnowledgeSources {
    let corpus = Arc::new(test_corpus());
    KnowledgeSources {
        embedder,
        index: corpus.clone(),
        documents: corpus,
        structured: Arc::new(InMemoryStructuredStore::with_facts(vec![donepezil_fact()])),
    }
}

/// Registry over the test corpus with a caller-supplied structured store.
pub fn registry_with_store(structured: Arc<dyn StructuredStore>) -> Arc<ToolRegistry> {
    let sources = KnowledgeSources {
        structured,
        ..knowledge_sources(Arc::new(KeywordEmbedder))
    };
    Arc::new(default_registry(&sources, &ToolSettings::default()))
}

pub fn test_registry() -> Arc<ToolRegistry> {
    Arc::new(default_registry(
        &knowledge_sources(Arc::new(KeywordEmbedder)),
        &ToolSettings::default(),
    ))
}
