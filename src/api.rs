// src/api.rs
//! Read-only HTTP surface for downstream viewers. Serves the snapshot
//! published by the last successful run; never blocks on a run in progress.
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::engine::{LeadEngine, RunReport};
use crate::lead::{Classification, Lead, RunMetadata};

const DEFAULT_LIMIT: usize = 100;
const DEFAULT_RUNS_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LeadEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/leads", get(list_leads))
        .route("/leads/{id}", get(get_lead))
        .route("/metadata", get(metadata))
        .route("/seen", get(seen))
        .route("/debug/runs", get(debug_runs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    pub limit: Option<usize>,
    pub min_score: Option<f32>,
    pub classification: Option<Classification>,
    pub region: Option<String>,
    #[serde(default)]
    pub new_only: bool,
}

/// Ranked leads, filtered; order is the persisted order.
async fn list_leads(State(state): State<AppState>, Query(q): Query<LeadsQuery>) -> Json<Vec<Lead>> {
    let snap = state.engine.snapshot();
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT);
    let out = snap
        .leads
        .iter()
        .filter(|l| q.min_score.is_none_or(|min| l.score >= min))
        .filter(|l| q.classification.is_none_or(|c| l.classification == c))
        .filter(|l| {
            q.region
                .as_deref()
                .is_none_or(|r| l.region.eq_ignore_ascii_case(r))
        })
        .filter(|l| !q.new_only || l.is_new)
        .take(limit)
        .cloned()
        .collect();
    Json(out)
}

async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, StatusCode> {
    state
        .engine
        .snapshot()
        .leads
        .iter()
        .find(|l| l.identity_key == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn metadata(State(state): State<AppState>) -> Result<Json<RunMetadata>, StatusCode> {
    state
        .engine
        .snapshot()
        .metadata
        .clone()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Sorted identity keys of every stored lead.
async fn seen(State(state): State<AppState>) -> Json<BTreeSet<String>> {
    Json(state.engine.snapshot().seen.clone())
}

#[derive(Deserialize)]
struct RunsQuery {
    limit: Option<usize>,
}

async fn debug_runs(
    State(state): State<AppState>,
    Query(q): Query<RunsQuery>,
) -> Json<Vec<RunReport>> {
    Json(
        state
            .engine
            .history()
            .snapshot_last_n(q.limit.unwrap_or(DEFAULT_RUNS_LIMIT)),
    )
}
