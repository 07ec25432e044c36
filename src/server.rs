//! HTTP endpoint for the agent
//!
//! - `POST /run` with `{"task": "..."}` runs the agent once
//! - `GET /health` reports readiness and the configured model
//!
//! Runs are serialized: one task is in flight at a time.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::agent::{AgentLoop, Context, LlmClient};
use crate::Result;

/// Shared state behind the routes
pub struct AppState<C: LlmClient> {
    agent: AgentLoop<C>,
    context: Mutex<Context>,
}

impl<C: LlmClient> AppState<C> {
    pub fn new(agent: AgentLoop<C>, context: Context) -> Self {
        Self {
            agent,
            context: Mutex::new(context),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub task: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub result: String,
    pub processing_time: String,
}

/// Build the router
pub fn router<C: LlmClient + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/run", post(run_agent::<C>))
        .route("/health", get(health::<C>))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve<C: LlmClient + 'static>(state: Arc<AppState<C>>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Listening on http://{}", addr);
    println!("Server ready! Test with:");
    println!(
        "curl -X POST http://{}/run -H 'Content-Type: application/json' -d '{{\"task\": \"Please calculate 7 + 4\"}}'",
        addr
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// POST /run
async fn run_agent<C: LlmClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<RunRequest>,
) -> (StatusCode, Json<Value>) {
    let start = Instant::now();
    let context = state.context.lock().await;

    match state.agent.run(&req.task, &context).await {
        Ok(response) => {
            let body = RunResponse {
                result: response.content,
                processing_time: format!("{:.2}s", start.elapsed().as_secs_f64()),
            };
            (StatusCode::OK, Json(json!(body)))
        }
        Err(e) => {
            tracing::warn!("Agent run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

// GET /health
async fn health<C: LlmClient + 'static>(State(state): State<Arc<AppState<C>>>) -> Json<Value> {
    Json(json!({
        "status": "ready",
        "model": state.agent.client().model(),
    }))
}
