//! End-to-end integration tests for NeuroCite.
//!
//! These tests wire the real pieces together (JSON-lines corpus on disk,
//! SQLite compound store, LLM-driven reasoner, HTTP gateway) and script
//! only the model provider.

use std::io::Write;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use neurocite_agent::{Agent, INSUFFICIENT_EVIDENCE};
use neurocite_config::AppConfig;
use neurocite_core::error::ProviderError;
use neurocite_core::event::{AgentEvent, EventBus};
use neurocite_core::evidence::StructuredFact;
use neurocite_core::message::{Message, MessageToolCall};
use neurocite_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use neurocite_gateway::{GatewayState, QueryResponse, build_router};
use neurocite_retrieval::{JsonlCorpus, ProviderEmbedder, SqliteStructuredStore};
use neurocite_tools::{KnowledgeSources, ToolSettings, default_registry};
use tempfile::TempDir;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Scripted completions in sequence; embeddings by topic keyword.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let t = text.to_lowercase();
    if t.contains("aggregat") || t.contains("amyloid") || t.contains("synuclein") {
        vec![1.0, 0.0, 0.0]
    } else if t.contains("cholinesterase") || t.contains("donepezil") {
        vec![0.0, 1.0, 0.0]
    } else {
        vec![0.0, 0.0, 3.0]
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();
        if count >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                count,
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[count].clone())
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| keyword_vector(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = vec![MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }];
    ProviderResponse {
        message: msg,
        usage: None,
        model: "mock".into(),
    }
}

// ── Knowledge base on disk ───────────────────────────────────────────────

const CORPUS: &[(&str, &str, &str, [f32; 3])] = &[
    (
        "31000001",
        "Protein aggregation and neuronal death",
        "Misfolded protein aggregates such as amyloid-beta oligomers are toxic to neurons.",
        [1.0, 0.0, 0.1],
    ),
    (
        "31000002",
        "Alpha-synuclein fibrils in Parkinson's disease",
        "Alpha-synuclein aggregation into fibrils drives dopaminergic neuron loss.",
        [0.9, 0.1, 0.0],
    ),
    (
        "31000003",
        "Donepezil and acetylcholinesterase inhibition",
        "Donepezil is a reversible acetylcholinesterase inhibitor used in Alzheimer's disease.",
        [0.0, 1.0, 0.0],
    ),
];

struct Fixture {
    _dir: TempDir,
    corpus: Arc<JsonlCorpus>,
    store: Arc<SqliteStructuredStore>,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let corpus_path = dir.path().join("corpus.jsonl");
    let mut file = std::fs::File::create(&corpus_path).unwrap();
    for (pmid, title, text, embedding) in CORPUS {
        let line = serde_json::json!({
            "pmid": pmid, "title": title, "text": text, "embedding": embedding,
        });
        writeln!(file, "{line}").unwrap();
    }
    writeln!(file, "{{ this line is corrupt").unwrap();
    drop(file);

    let corpus = Arc::new(JsonlCorpus::open(&corpus_path).unwrap());
    assert_eq!(corpus.len(), 3);

    let db_path = dir.path().join("compounds.db");
    let store = SqliteStructuredStore::new(db_path.to_str().unwrap()).await.unwrap();
    store
        .insert(&StructuredFact {
            entity: "DONEPEZIL".into(),
            target: "ACHE".into(),
            potency: Some(6.7),
            units: Some("nM".into()),
            uniprot_id: Some("P22303".into()),
            source_pmid: Some("31000003".into()),
        })
        .await
        .unwrap();

    Fixture {
        _dir: dir,
        corpus,
        store: Arc::new(store),
    }
}

fn build_agent(fx: &Fixture, provider: Arc<ScriptedProvider>, config: &AppConfig) -> Agent {
    let sources = KnowledgeSources {
        embedder: Arc::new(ProviderEmbedder::new(provider.clone(), "mock-embedding")),
        index: fx.corpus.clone(),
        documents: fx.corpus.clone(),
        structured: fx.store.clone(),
    };
    let tools = Arc::new(default_registry(&sources, &ToolSettings::default()));
    Agent::from_config(config, provider, tools, Arc::new(EventBus::default()))
}

// ── E2E: Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_casual_question_gets_technical_expansion_and_citations() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response(
            r#"["neuronal protein aggregation neurotoxicity", "amyloid-beta oligomer cytotoxicity", "alpha-synuclein aggregation neurodegeneration"]"#,
        ),
        tool_response(
            "retrieve_context",
            serde_json::json!({"query": "neuronal protein aggregation neurotoxicity"}),
        ),
        text_response("DONE"),
        text_response(
            "Misfolded protein aggregates such as amyloid-beta oligomers are neurotoxic [PMID:31000001], \
             and alpha-synuclein fibrils drive neuron loss [PMID:31000002].",
        ),
    ]));
    let agent = build_agent(&fx, provider.clone(), &AppConfig::default());

    let answer = agent.answer("why do sticky protein clumps kill neurons?").await.unwrap();

    assert!(!answer.low_confidence());
    assert_eq!(answer.hops, 1);
    assert!(answer.expanded_queries.iter().all(|q| q.contains("aggregation") || q.contains("oligomer")));
    assert_eq!(answer.cited_papers.len(), 2);
    for paper in &answer.cited_papers {
        assert!(answer.trace.iter().any(|h| h.result_summary.contains(&paper.pmid)));
    }
    assert_eq!(provider.calls(), 4);

    // The reasoning request offered both tools.
    let reasoning = &provider.requests.lock().unwrap()[1];
    assert_eq!(reasoning.tools.len(), 2);
}

#[tokio::test]
async fn e2e_literature_plus_potency() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response(r#"["donepezil acetylcholinesterase inhibition"]"#),
        tool_response(
            "retrieve_context",
            serde_json::json!({"query": "donepezil acetylcholinesterase inhibition"}),
        ),
        tool_response("lookup_structured_data", serde_json::json!({"entity_or_topic": "donepezil"})),
        text_response("DONE"),
        text_response(
            "Donepezil is a reversible acetylcholinesterase inhibitor [PMID:31000003] \
             with an IC50 of 6.7 nM against ACHE [DATA:DONEPEZIL].",
        ),
    ]));
    let agent = build_agent(&fx, provider, &AppConfig::default());

    let answer = agent.answer("how potent is donepezil on AChE?").await.unwrap();

    assert_eq!(answer.hops, 2);
    assert_eq!(answer.trace[0].tool, "retrieve_context");
    assert_eq!(answer.trace[1].tool, "lookup_structured_data");
    assert_eq!(answer.trace[1].result_summary, "DONEPEZIL → ACHE IC50=6.7 nM");
    assert!(answer.text.contains("[PMID:31000003]"));
    assert!(answer.text.contains("6.7 nM"));
    assert_eq!(answer.cited_papers[0].pmid, "31000003");
}

#[tokio::test]
async fn e2e_unindexed_condition_is_honestly_low_confidence() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response(r#"["Kufor-Rakeb syndrome ATP13A2 lysosomal dysfunction"]"#),
        tool_response(
            "retrieve_context",
            serde_json::json!({"query": "Kufor-Rakeb syndrome ATP13A2 lysosomal dysfunction"}),
        ),
        text_response("DONE"),
    ]));
    let agent = build_agent(&fx, provider.clone(), &AppConfig::default());

    let answer = agent.answer("what causes Kufor-Rakeb syndrome?").await.unwrap();

    assert!(answer.low_confidence());
    assert!(answer.best_distance.unwrap() > 1.2);
    assert!(answer.text.starts_with(INSUFFICIENT_EVIDENCE));
    assert!(answer.cited_papers.is_empty());
    // No synthesis call on the low-confidence path.
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn e2e_hop_limit_is_enforced() {
    let fx = fixture().await;
    let mut config = AppConfig::default();
    config.agent.max_hops = 3;

    let mut script = vec![text_response(r#"["amyloid aggregation"]"#)];
    for _ in 0..3 {
        script.push(tool_response(
            "retrieve_context",
            serde_json::json!({"query": "amyloid aggregation"}),
        ));
    }
    script.push(text_response("Amyloid aggregates are neurotoxic [PMID:31000001]."));
    let provider = Arc::new(ScriptedProvider::new(script));
    let agent = build_agent(&fx, provider.clone(), &config);

    let answer = agent.answer("amyloid clumps").await.unwrap();

    assert_eq!(answer.hops, 3);
    assert_eq!(provider.calls(), 5);
}

#[tokio::test]
async fn e2e_malformed_tool_arguments_become_failed_hop() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response(r#"["amyloid aggregation"]"#),
        tool_response("retrieve_context", serde_json::json!({"q": "wrong key"})),
        tool_response("retrieve_context", serde_json::json!({"query": "amyloid aggregation"})),
        text_response("DONE"),
        text_response("Amyloid aggregates are neurotoxic [PMID:31000001]."),
    ]));
    let agent = build_agent(&fx, provider, &AppConfig::default());

    let answer = agent.answer("amyloid clumps").await.unwrap();

    assert_eq!(answer.hops, 2);
    assert!(!answer.trace[0].success);
    assert!(answer.trace[0].result_summary.contains("Invalid tool arguments"));
    assert!(answer.trace[1].success);
    assert!(!answer.low_confidence());
}

#[tokio::test]
async fn e2e_progress_events_follow_the_run() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("not a json array"),
        tool_response("lookup_structured_data", serde_json::json!({"entity_or_topic": "donepezil"})),
        text_response("DONE"),
    ]));
    let agent = build_agent(&fx, provider, &AppConfig::default());
    let mut rx = agent.event_bus().subscribe();

    let answer = agent.answer("donepezil").await.unwrap();
    assert_eq!(answer.expanded_queries, vec!["donepezil"]);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(
        events[0].as_ref(),
        AgentEvent::QueryExpanded { fell_back: true, .. }
    ));
    assert!(events.iter().any(|e| matches!(e.as_ref(), AgentEvent::Degraded { .. })));
    assert!(matches!(
        events.last().unwrap().as_ref(),
        AgentEvent::Answered { low_confidence: true, .. }
    ));
}

// ── E2E: HTTP gateway ────────────────────────────────────────────────────

async fn post(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn e2e_gateway_query_round_trip() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response(r#"["donepezil acetylcholinesterase"]"#),
        tool_response(
            "retrieve_context",
            serde_json::json!({"query": "donepezil acetylcholinesterase"}),
        ),
        text_response("DONE"),
        text_response("Donepezil inhibits acetylcholinesterase [PMID:31000003]."),
    ]));
    let agent = Arc::new(build_agent(&fx, provider, &AppConfig::default()));
    let app = build_router(Arc::new(GatewayState::new(agent)));

    let (status, body) = post(app, r#"{"question": "what does donepezil do?"}"#).await;
    assert_eq!(status, StatusCode::OK);

    let response: QueryResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.hops, 1);
    assert!(!response.low_confidence);
    assert_eq!(response.cited_papers[0].pmid, "31000003");
    assert_eq!(response.trace[0].args["query"], "donepezil acetylcholinesterase");
    assert_eq!(response.expanded_queries, vec!["donepezil acetylcholinesterase"]);
}

#[tokio::test]
async fn e2e_gateway_rejects_empty_question_without_model_calls() {
    let fx = fixture().await;
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let agent = Arc::new(build_agent(&fx, provider.clone(), &AppConfig::default()));
    let app = build_router(Arc::new(GatewayState::new(agent)));

    let (status, body) = post(app, r#"{"question": ""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No question provided");
    assert_eq!(provider.calls(), 0);
}
