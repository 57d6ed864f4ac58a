//! The multi-hop orchestrator.
//!
//! One request moves through `Expanding → Hopping → Synthesizing → Done`
//! (or `Failed`). Every hop asks the [`Reasoner`] for the next action,
//! runs the chosen tool through the [`ToolRegistry`] and folds its output
//! into the request's [`EvidencePool`]. The loop ends when the reasoner
//! stops, the hop limit is reached, the deadline passes, reasoning fails,
//! or every tool has failed.

use crate::confidence::ConfidenceEvaluator;
use crate::expander::QueryExpander;
use crate::reasoner::{LlmReasoner, NextAction, Reasoner, ReasoningInput};
use crate::synthesizer::{ResponseSynthesizer, SynthesisMode};
use chrono::Utc;
use neurocite_config::AppConfig;
use neurocite_core::answer::{Answer, Hop};
use neurocite_core::error::{Error, ToolError};
use neurocite_core::event::{AgentEvent, EventBus};
use neurocite_core::evidence::EvidencePool;
use neurocite_core::provider::Provider;
use neurocite_core::tool::{ToolCall, ToolOutput, ToolRegistry};
use neurocite_tools::retrieve_context;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Longest question accepted.
pub const MAX_QUESTION_CHARS: usize = 4_000;

/// Excerpt length used when summarizing evidence for the reasoner.
const REASONING_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Expanding,
    Hopping,
    Synthesizing,
    Done,
    Failed,
}

/// A failure the agent recovered from by doing less.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Degradation {
    #[error("query expansion unavailable ({0}); searching with the raw question")]
    ExpansionUnavailable(String),

    #[error("tool {tool} failed: {error}")]
    ToolInvocation { tool: String, error: String },

    #[error("reasoning unavailable ({0}); synthesizing early")]
    ReasoningUnavailable(String),

    #[error("request deadline of {0}s reached; synthesizing early")]
    Deadline(u64),

    #[error("every tool has failed; synthesizing early")]
    ToolsExhausted,
}

/// Loop limits.
#[derive(Debug, Clone)]
pub struct AgentLimits {
    pub max_hops: u32,
    pub request_timeout: Duration,
    pub tool_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_hops: 5,
            request_timeout: Duration::from_secs(60),
            tool_retries: 1,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// All state for one question. Created per request, never shared.
#[derive(Debug)]
pub struct RequestContext {
    pub question: String,
    pub state: AgentState,
    pub queries: Vec<String>,
    /// Lowercased queries already sent to the literature search.
    exhausted: BTreeSet<String>,
    pub pool: EvidencePool,
    pub trace: Vec<Hop>,
    failed_tools: BTreeSet<String>,
    pub degradations: Vec<Degradation>,
    deadline: Instant,
}

impl RequestContext {
    fn new(question: String, deadline: Instant) -> Self {
        Self {
            question,
            state: AgentState::Expanding,
            queries: Vec::new(),
            exhausted: BTreeSet::new(),
            pool: EvidencePool::new(),
            trace: Vec::new(),
            failed_tools: BTreeSet::new(),
            degradations: Vec::new(),
            deadline,
        }
    }

    fn transition(&mut self, next: AgentState) {
        info!(from = ?self.state, to = ?next, "Agent state transition");
        self.state = next;
    }

    /// Expanded queries not yet used for a literature search.
    pub fn pending_queries(&self) -> Vec<String> {
        self.queries
            .iter()
            .filter(|q| !self.exhausted.contains(&q.to_lowercase()))
            .cloned()
            .collect()
    }

    pub fn hops(&self) -> u32 {
        self.trace.len() as u32
    }
}

/// Answers questions. Holds only shared, immutable collaborators, so one
/// instance serves any number of concurrent requests.
pub struct Agent {
    expander: QueryExpander,
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<ToolRegistry>,
    evaluator: ConfidenceEvaluator,
    synthesizer: ResponseSynthesizer,
    limits: AgentLimits,
    event_bus: Arc<EventBus>,
}

impl Agent {
    pub fn new(
        expander: QueryExpander,
        reasoner: Arc<dyn Reasoner>,
        tools: Arc<ToolRegistry>,
        synthesizer: ResponseSynthesizer,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            expander,
            reasoner,
            tools,
            evaluator: ConfidenceEvaluator::default(),
            synthesizer,
            limits: AgentLimits::default(),
            event_bus,
        }
    }

    /// Wire an agent from configuration. Every model-backed component
    /// shares `provider`; expansion may use its own model.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let settings = &config.agent;
        let expander = QueryExpander::new(provider.clone(), config.expansion_model())
            .with_count(settings.expansions)
            .with_temperature(config.expansion.temperature);
        let reasoner = LlmReasoner::new(provider.clone(), config.default_model.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);
        let synthesizer = ResponseSynthesizer::new(provider, config.default_model.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);

        Self::new(expander, Arc::new(reasoner), tools, synthesizer, event_bus)
            .with_confidence_threshold(settings.confidence_threshold)
            .with_limits(AgentLimits {
                max_hops: settings.max_hops,
                request_timeout: Duration::from_secs(settings.request_timeout_secs),
                tool_retries: settings.tool_retries,
                ..AgentLimits::default()
            })
    }

    pub fn with_limits(mut self, limits: AgentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.limits.max_hops = max_hops;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.evaluator = ConfidenceEvaluator::new(threshold);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Answer one question.
    ///
    /// Fails only for a malformed question; every collaborator failure is
    /// absorbed into a degraded (but honest) answer.
    pub async fn answer(&self, question: &str) -> Result<Answer, Error> {
        let (answer, _) = self.answer_with_context(question).await?;
        Ok(answer)
    }

    /// Like [`Agent::answer`], also returning the finished request context.
    pub async fn answer_with_context(&self, question: &str) -> Result<(Answer, RequestContext), Error> {
        let question = question.trim();
        let deadline = Instant::now() + self.limits.request_timeout;
        let mut ctx = RequestContext::new(question.to_string(), deadline);

        if let Err(e) = validate_question(question) {
            ctx.transition(AgentState::Failed);
            return Err(e);
        }

        self.expand(&mut ctx).await;

        ctx.transition(AgentState::Hopping);
        self.hop_loop(&mut ctx).await;

        ctx.transition(AgentState::Synthesizing);
        let verdict = self.evaluator.evaluate(&ctx.pool);
        let synthesis = self
            .synthesizer
            .synthesize(&ctx.question, &ctx.pool, verdict, self.evaluator.threshold())
            .await;
        if synthesis.mode == SynthesisMode::Extractive {
            warn!("Answer is extractive: synthesis model unavailable");
        }

        let answer = Answer {
            text: synthesis.text,
            cited_papers: synthesis.cited_papers,
            hops: ctx.hops(),
            trace: ctx.trace.clone(),
            confidence: verdict,
            best_distance: ctx.pool.best_distance(),
            expanded_queries: ctx.queries.clone(),
        };

        ctx.transition(AgentState::Done);
        self.event_bus.publish(AgentEvent::Answered {
            hops: answer.hops,
            low_confidence: answer.low_confidence(),
            cited: answer.cited_papers.len(),
            timestamp: Utc::now(),
        });
        info!(
            hops = answer.hops,
            low_confidence = answer.low_confidence(),
            cited = answer.cited_papers.len(),
            degradations = ctx.degradations.len(),
            "Question answered"
        );

        Ok((answer, ctx))
    }

    async fn expand(&self, ctx: &mut RequestContext) {
        let expansion = self.expander.expand(&ctx.question).await;
        self.event_bus.publish(AgentEvent::QueryExpanded {
            queries: expansion.queries.clone(),
            fell_back: expansion.fell_back,
            timestamp: Utc::now(),
        });
        if let Some(reason) = expansion.reason {
            self.degrade(ctx, Degradation::ExpansionUnavailable(reason));
        }
        ctx.queries = expansion.queries;
    }

    fn degrade(&self, ctx: &mut RequestContext, degradation: Degradation) {
        warn!(%degradation, "Degraded");
        self.event_bus.publish(AgentEvent::Degraded {
            reason: degradation.to_string(),
            timestamp: Utc::now(),
        });
        ctx.degradations.push(degradation);
    }

    fn all_tools_failed(&self, ctx: &RequestContext) -> bool {
        !self.tools.is_empty()
            && self
                .tools
                .names()
                .iter()
                .all(|name| ctx.failed_tools.contains(*name))
    }

    async fn hop_loop(&self, ctx: &mut RequestContext) {
        let definitions = self.tools.definitions();

        loop {
            if ctx.hops() >= self.limits.max_hops {
                info!(max_hops = self.limits.max_hops, "Hop limit reached");
                break;
            }
            if self.all_tools_failed(ctx) {
                self.degrade(ctx, Degradation::ToolsExhausted);
                break;
            }

            let pending = ctx.pending_queries();
            let summary = ctx.pool.summary(REASONING_SNIPPET_CHARS);
            let input = ReasoningInput {
                question: &ctx.question,
                pending_queries: &pending,
                evidence_summary: &summary,
                trace: &ctx.trace,
                tools: &definitions,
                hops_remaining: self.limits.max_hops - ctx.hops(),
            };

            let outcome = tokio::time::timeout_at(ctx.deadline, self.reasoner.next_action(input)).await;
            let action = match outcome {
                Err(_) => {
                    self.degrade(ctx, Degradation::Deadline(self.limits.request_timeout.as_secs()));
                    break;
                }
                Ok(Err(e)) => {
                    self.degrade(ctx, Degradation::ReasoningUnavailable(e.to_string()));
                    break;
                }
                Ok(Ok(action)) => action,
            };

            let NextAction::Continue { tool, arguments } = action else {
                debug!(hops = ctx.hops(), "Reasoner chose to stop");
                break;
            };

            if !self.run_hop(ctx, ToolCall { name: tool, arguments }).await {
                break;
            }
        }
    }

    /// Execute one hop and record it. Returns false when the deadline
    /// passed during the call.
    async fn run_hop(&self, ctx: &mut RequestContext, call: ToolCall) -> bool {
        let hop = ctx.hops() + 1;
        self.event_bus.publish(AgentEvent::HopStarted {
            hop,
            tool: call.name.clone(),
            args: call.arguments.clone(),
            timestamp: Utc::now(),
        });
        debug!(hop, tool = %call.name, args = %call.arguments, "Hop started");

        if call.name == retrieve_context::NAME {
            if let Some(query) = call.arguments["query"].as_str() {
                ctx.exhausted.insert(query.trim().to_lowercase());
            }
        }

        let started = std::time::Instant::now();
        let (outcome, deadline_hit) =
            match tokio::time::timeout_at(ctx.deadline, self.invoke_with_retry(&call)).await {
                Ok(outcome) => (outcome, false),
                Err(_) => (
                    Err(ToolError::Timeout {
                        tool_name: call.name.clone(),
                        timeout_secs: self.limits.request_timeout.as_secs(),
                    }),
                    true,
                ),
            };

        let (success, result_summary) = match outcome {
            Ok(output) => {
                ctx.failed_tools.remove(&call.name);
                let new_docs = ctx.pool.add_chunks(output.chunks);
                let new_facts = ctx.pool.add_facts(output.facts);
                debug!(hop, new_docs, new_facts, "Evidence added");
                (true, output.summary)
            }
            Err(e) => {
                ctx.failed_tools.insert(call.name.clone());
                self.degrade(
                    ctx,
                    Degradation::ToolInvocation {
                        tool: call.name.clone(),
                        error: e.to_string(),
                    },
                );
                (false, format!("Error: {e}"))
            }
        };

        self.event_bus.publish(AgentEvent::HopCompleted {
            hop,
            tool: call.name.clone(),
            success,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        ctx.trace.push(Hop {
            hop,
            tool: call.name,
            args: call.arguments,
            result_summary,
            success,
        });

        if deadline_hit {
            self.degrade(ctx, Degradation::Deadline(self.limits.request_timeout.as_secs()));
        }
        !deadline_hit
    }

    /// Run a tool, retrying transient failures a bounded number of times.
    async fn invoke_with_retry(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let mut attempt = 0;
        loop {
            match self.tools.execute(call).await {
                Err(e) if e.is_transient() && attempt < self.limits.tool_retries => {
                    attempt += 1;
                    warn!(tool = %call.name, attempt, error = %e, "Tool unavailable; retrying");
                    tokio::time::sleep(self.limits.retry_backoff).await;
                }
                outcome => return outcome,
            }
        }
    }
}

fn validate_question(question: &str) -> Result<(), Error> {
    if question.is_empty() {
        return Err(Error::MalformedRequest("No question provided".into()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(Error::MalformedRequest(format!(
            "Question exceeds {MAX_QUESTION_CHARS} characters"
        )));
    }
    Ok(())
}
