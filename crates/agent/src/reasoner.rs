//! Hop reasoning: given what has been gathered so far, pick the next tool
//! call or decide to stop.

use async_trait::async_trait;
use neurocite_core::answer::Hop;
use neurocite_core::error::ProviderError;
use neurocite_core::message::Message;
use neurocite_core::provider::{Provider, ProviderRequest, ToolDefinition};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the agent should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    Continue {
        tool: String,
        arguments: serde_json::Value,
    },
    Stop,
}

/// Everything the reasoning step may look at.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningInput<'a> {
    pub question: &'a str,
    /// Expanded queries not yet sent to the literature search.
    pub pending_queries: &'a [String],
    /// Digest of the evidence pool.
    pub evidence_summary: &'a str,
    pub trace: &'a [Hop],
    pub tools: &'a [ToolDefinition],
    pub hops_remaining: u32,
}

/// Decides the next action. Implementations must not retry internally;
/// the orchestrator treats an error as "stop and synthesize".
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn next_action(&self, input: ReasoningInput<'_>) -> Result<NextAction, ProviderError>;
}

const SYSTEM_PROMPT: &str = "You are a neuroscience research assistant that gathers evidence \
before anyone answers. You never answer the question yourself.\n\
On each turn either call exactly one tool, or reply with the single word DONE when the \
evidence is sufficient or no tool can add anything.\n\
- Use retrieve_context for literature; pass one of the pending search queries verbatim when \
any remain.\n\
- Use lookup_structured_data when the question names a drug or compound and asks about \
potency, binding, IC50 or targets.\n\
- Do not repeat a call that already appears in the trace.";

/// Reasoner backed by a function-calling language model.
pub struct LlmReasoner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmReasoner {
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

    fn render(input: &ReasoningInput<'_>) -> String {
        let mut out = format!("Question: {}\n\n", input.question);

        if input.pending_queries.is_empty() {
            out.push_str("Pending search queries: none\n\n");
        } else {
            out.push_str("Pending search queries:\n");
            for q in input.pending_queries {
                out.push_str(&format!("- {q}\n"));
            }
            out.push('\n');
        }

        if input.trace.is_empty() {
            out.push_str("Trace: no tool calls yet\n\n");
        } else {
            out.push_str("Trace:\n");
            for hop in input.trace {
                out.push_str(&format!(
                    "{}. {}({}) -> {}\n",
                    hop.hop, hop.tool, hop.args, hop.result_summary
                ));
            }
            out.push('\n');
        }

        out.push_str("Evidence so far:\n");
        out.push_str(input.evidence_summary);
        out.push_str(&format!("\n\nTool calls remaining: {}", input.hops_remaining));
        out
    }
}

/// Turn a model reply into an action: the first tool call wins, no tool
/// call means stop.
pub fn action_from_message(message: &Message) -> NextAction {
    let Some(call) = message.tool_calls.first() else {
        return NextAction::Stop;
    };
    if message.tool_calls.len() > 1 {
        warn!(
            requested = message.tool_calls.len(),
            "Model asked for several tools in one turn; running only the first"
        );
    }

    // Malformed JSON is passed through as a string so schema validation
    // rejects it as a failed hop.
    let arguments = serde_json::from_str(&call.arguments)
        .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()));

    NextAction::Continue {
        tool: call.name.clone(),
        arguments,
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn next_action(&self, input: ReasoningInput<'_>) -> Result<NextAction, ProviderError> {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(Self::render(&input))],
            self.temperature,
        );
        request.tools = input.tools.to_vec();
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;
        let action = action_from_message(&response.message);
        debug!(?action, "Reasoning step");
        Ok(action)
    }
}
