//! Thin HTTP surface in front of the job handler.
//!
//! The queue dispatcher that feeds this worker is an external
//! collaborator; this module is only the local stand-in for its request
//! dispatch. It deserializes, delegates to [`JobHandler::handle`], and
//! serializes -- no job logic lives here.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handler::{JobHandler, JobRequest, JobResult};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run one job to completion.
///
/// Always answers 200: failures travel in-band as `{"error": ...}`,
/// because the dispatcher contract has no out-of-band failure channel.
async fn run_job(
    State(handler): State<Arc<JobHandler>>,
    Json(job): Json<JobRequest>,
) -> Json<JobResult> {
    Json(handler.handle(job).await)
}

/// Build the ingress router: job execution plus liveness.
pub fn router(handler: Arc<JobHandler>) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(health_check))
        .route("/run", post(run_job))
        // Propagate request ID to the response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(handler)
}
