//! HTTP API gateway for NeuroCite.
//!
//! Routes:
//! - `POST /query`  ask a question, get a cited answer with its hop trace
//! - `GET /health`  liveness and version
//! - `GET /tools`   the tool definitions offered to the reasoning model
//!
//! Built on Axum; the agent is shared read-only across requests.

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use neurocite_agent::Agent;
use neurocite_core::answer::{Answer, CitedPaper, Hop};
use neurocite_core::error::Error;
use neurocite_core::provider::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<Agent>,
    pub start_time: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            start_time: Utc::now(),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/query", post(query_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: &neurocite_config::AppConfig,
    agent: Arc<Agent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(Arc::new(GatewayState::new(agent)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
}

/// The answer as served over HTTP and printed by `neurocite ask --json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub hops: u32,
    pub low_confidence: bool,
    pub trace: Vec<Hop>,
    pub cited_papers: Vec<CitedPaper>,
    pub best_distance: Option<f32>,
    pub confidence_note: String,
    pub expanded_queries: Vec<String>,
}

impl From<Answer> for QueryResponse {
    fn from(answer: Answer) -> Self {
        Self {
            low_confidence: answer.low_confidence(),
            confidence_note: answer.confidence.note().to_string(),
            answer: answer.text,
            hops: answer.hops,
            trace: answer.trace,
            cited_papers: answer.cited_papers,
            best_distance: answer.best_distance,
            expanded_queries: answer.expanded_queries,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error leaving the gateway as `{ "error": ... }`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match err {
            Error::MalformedRequest(m) => m,
            other => other.to_string(),
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
    tools: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        tools: state.agent.tools().len(),
    })
}

async fn tools_handler(State(state): State<SharedState>) -> Json<Vec<ToolDefinition>> {
    Json(state.agent.tools().definitions())
}

async fn query_handler(
    State(state): State<SharedState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected query body");
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Request body must be JSON of the form {\"question\": \"...\"}".into(),
        }
    })?;

    let request_id = Uuid::new_v4();
    let span = info_span!("query", %request_id);

    async move {
        info!(question_len = request.question.len(), "Query received");
        match state.agent.answer(&request.question).await {
            Ok(answer) => Ok(Json(QueryResponse::from(answer))),
            Err(e @ Error::MalformedRequest(_)) => {
                warn!(error = %e, "Malformed query");
                Err(ApiError::from(e))
            }
            Err(e) => {
                error!(error = %e, "Query pipeline failed");
                Err(ApiError::from(e))
            }
        }
    }
    .instrument(span)
    .await
}
