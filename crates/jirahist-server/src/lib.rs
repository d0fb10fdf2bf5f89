//! HTTP conversion service.
//!
//! Lets an ingestion pipeline post raw Jira issues and receive reconstructed
//! histories without linking the engine directly.

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use jirahist_core::{decode_issues, Issue, IssueAssembler, RawIssue};
use jirahist_fs::RunConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// Server state shared across handlers.
struct AppState {
    assembler: IssueAssembler,
    permits: Semaphore,
}

/// Run one conversion on the blocking pool once a permit is free.
async fn run_conversion(state: Arc<AppState>, raw: RawIssue) -> Result<Issue> {
    let _permit = state.permits.acquire().await?;
    let worker = Arc::clone(&state);
    let issue = tokio::task::spawn_blocking(move || worker.assembler.assemble(&raw)).await?;
    Ok(issue)
}

/// Build the router for a loaded configuration.
///
/// # Errors
/// Returns error if the configuration cannot produce lookup tables.
pub fn router(config: &RunConfig) -> Result<Router> {
    let engine = config.to_reconstruction_config()?;
    let state = Arc::new(AppState {
        assembler: IssueAssembler::new(Arc::new(engine)),
        permits: Semaphore::new(config.server.max_concurrent_conversions),
    });

    Ok(Router::new()
        .route("/health", get(health))
        .route("/convert", post(convert))
        .route("/convert/batch", post(convert_batch))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state))
}

/// Start the conversion server.
///
/// # Errors
/// Returns error if binding fails or server encounters an error.
pub async fn serve(config: &RunConfig, host: &str, port: u16) -> Result<()> {
    let app = router(config)?;

    let addr = format!("{host}:{port}");
    info!(
        address = %addr,
        max_concurrent = config.server.max_concurrent_conversions,
        "Starting conversion server"
    );

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Request/Response types ---

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BatchResponse {
    issues: Vec<Issue>,
    count: usize,
    /// Records dropped because they were not valid issues.
    skipped: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn convert(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawIssue>,
) -> Result<Json<Issue>, AppError> {
    debug!(issue = %raw.key, "Converting issue");
    Ok(Json(run_conversion(state, raw).await?))
}

async fn convert_batch(
    State(state): State<Arc<AppState>>,
    Json(values): Json<Vec<Value>>,
) -> Result<Json<BatchResponse>, AppError> {
    let received = values.len();
    let raws = decode_issues(values, "/convert/batch");
    let skipped = received - raws.len();

    let handles: Vec<_> = raws
        .into_iter()
        .map(|raw| tokio::spawn(run_conversion(Arc::clone(&state), raw)))
        .collect();

    let mut issues = Vec::with_capacity(handles.len());
    for handle in handles {
        issues.push(handle.await??);
    }

    debug!(count = issues.len(), skipped, "Converted batch");
    let count = issues.len();
    Ok(Json(BatchResponse {
        issues,
        count,
        skipped,
    }))
}

// --- Error handling ---

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
