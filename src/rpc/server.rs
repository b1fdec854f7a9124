//! HTTP API server.
//!
//! - `POST /vote` queues a vote; a primary node proposes a block once a
//!   full batch is queued and no round is in flight
//! - `GET /chain` returns the full ledger snapshot for cross-node checks
//! - `GET /status`, `GET /health`, `GET /metrics`

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::consensus::{ConsensusEngine, ConsensusError, NodeId, PhaseBroadcaster};
use crate::ledger::Ledger;
use crate::utils::errors::NodeError;
use crate::utils::metrics::{counters, METRICS};
use crate::voting::{Vote, VotePool};

/// Everything the API handlers need, injected per node instance.
pub struct ApiContext<N: PhaseBroadcaster> {
    pub node_id: NodeId,
    pub is_primary: bool,
    pub engine: Arc<ConsensusEngine<N>>,
    pub ledger: Arc<Mutex<Ledger>>,
    pub pool: Arc<VotePool>,
}

#[derive(Debug, Deserialize)]
struct CastVoteRequest {
    voter_id: String,
    candidate_id: String,
}

#[derive(Debug, Serialize)]
struct CastVoteResponse {
    message: &'static str,
    pending: usize,
}

/// Bind `addr` and serve the API until the process exits.
pub async fn serve<N: PhaseBroadcaster>(addr: SocketAddr, ctx: Arc<ApiContext<N>>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .route("/vote", post(cast_vote::<N>))
        .route("/chain", get(chain::<N>))
        .route("/status", get(status::<N>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(ctx)),
        );

    info!("API listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn cast_vote<N: PhaseBroadcaster>(
    Extension(ctx): Extension<Arc<ApiContext<N>>>,
    Json(req): Json<CastVoteRequest>,
) -> impl IntoResponse {
    if req.voter_id.is_empty() || req.candidate_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "voter_id and candidate_id are required").into_response();
    }

    let pending = match ctx.pool.submit(Vote::new(req.voter_id, req.candidate_id)) {
        Ok(pending) => pending,
        Err(e) => return error_response(e.into()),
    };
    METRICS.inc(counters::VOTES_ACCEPTED);

    // Only the primary proposes, and only between rounds; votes queued
    // during a round ride in the next batch.
    if ctx.is_primary && ctx.pool.ready() && !ctx.engine.is_round_active().await {
        let batch = ctx.pool.drain();
        if let Err(e) = ctx.engine.propose(batch).await {
            // the votes were accepted; the proposal will be retried with
            // the next batch
            warn!("{}", NodeError::from(e));
        }
    }

    (
        StatusCode::CREATED,
        Json(CastVoteResponse {
            message: "vote accepted",
            pending,
        }),
    )
        .into_response()
}

async fn chain<N: PhaseBroadcaster>(
    Extension(ctx): Extension<Arc<ApiContext<N>>>,
) -> impl IntoResponse {
    let ledger = ctx.ledger.lock().await;
    let snapshot = ledger.snapshot();
    Json(serde_json::json!({
        "length": snapshot.len(),
        "consistent": ledger.is_consistent(),
        "chain": snapshot,
    }))
}

async fn status<N: PhaseBroadcaster>(
    Extension(ctx): Extension<Arc<ApiContext<N>>>,
) -> impl IntoResponse {
    let height = ctx.ledger.lock().await.height();
    Json(serde_json::json!({
        "node_id": ctx.node_id,
        "primary": ctx.is_primary,
        "view": ctx.engine.view(),
        "height": height,
        "round_active": ctx.engine.is_round_active().await,
        "pending_block_hash": ctx.engine.pending_hash().await,
        "pending_votes": ctx.pool.len(),
    }))
}

async fn metrics() -> impl IntoResponse {
    Json(serde_json::json!(METRICS.snapshot()))
}

fn error_response(err: NodeError) -> Response {
    warn!("request refused: {}", err);
    let code = match &err {
        NodeError::Intake(_) => StatusCode::SERVICE_UNAVAILABLE,
        NodeError::Consensus(ConsensusError::EmptyBatch) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, err.to_string()).into_response()
}
