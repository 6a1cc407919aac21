// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beat marketplace routes.

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireCaller};
use crate::models::{Beat, BeatListing, BeatUpdate, BeatView, LikeToggle, NewBeat};
use crate::routes::extract::ValidatedJson;
use crate::services::catalog::{DEFAULT_LATEST_COUNT, DEFAULT_POPULAR_LIMIT};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Listing sizes are clamped to this.
const MAX_LISTING: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/beats", get(list_beats).post(add_beat))
        .route("/api/beats/popular", get(popular_beats))
        .route("/api/beats/latest", get(latest_beats))
        .route("/api/beats/search", get(search_beats))
        .route(
            "/api/beats/{id}",
            get(get_beat).patch(update_beat).delete(delete_beat),
        )
        .route("/api/beats/{id}/play", post(record_play))
        .route("/api/beats/{id}/like", get(like_status).post(toggle_like))
}

async fn list_beats(State(state): State<Arc<AppState>>) -> Result<Json<BeatListing>> {
    Ok(Json(state.catalog.get_all_beats().await?))
}

#[derive(Deserialize)]
struct PopularQuery {
    limit: Option<u32>,
}

async fn popular_beats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularQuery>,
) -> Result<Json<BeatListing>> {
    let limit = params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT).clamp(1, MAX_LISTING);
    Ok(Json(state.catalog.get_popular_beats(limit).await?))
}

#[derive(Deserialize)]
struct LatestQuery {
    count: Option<u32>,
}

async fn latest_beats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestQuery>,
) -> Result<Json<BeatListing>> {
    let count = params.count.unwrap_or(DEFAULT_LATEST_COUNT).clamp(1, MAX_LISTING);
    Ok(Json(state.catalog.get_latest_beats(count).await?))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_beats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<BeatListing>> {
    Ok(Json(state.catalog.search_beats(&params.q).await?))
}

async fn get_beat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BeatView>> {
    Ok(Json(state.catalog.get_beat_by_id(&id).await?))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedBeat {
    pub id: String,
}

async fn add_beat(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(beat): ValidatedJson<NewBeat>,
) -> Result<(StatusCode, Json<CreatedBeat>)> {
    let id = state.catalog.add_beat(beat, Utc::now()).await?;
    tracing::info!(beat_id = %id, by = %admin.uid, "Admin added beat");
    Ok((StatusCode::CREATED, Json(CreatedBeat { id })))
}

async fn update_beat(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<BeatUpdate>,
) -> Result<Json<Beat>> {
    Ok(Json(state.catalog.update_beat(&id, update, Utc::now()).await?))
}

async fn delete_beat(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.catalog.delete_beat(&id).await?;
    tracing::info!(beat_id = %id, by = %admin.uid, "Admin deleted beat");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlayCount {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub plays: u64,
}

/// Anonymous listeners count too.
async fn record_play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PlayCount>> {
    let plays = state.catalog.update_beat_plays(&id).await?;
    Ok(Json(PlayCount { plays }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LikeStatus {
    pub liked: bool,
}

async fn like_status(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> Json<LikeStatus> {
    let liked = state.catalog.get_beat_like_status(&id, &caller.uid).await;
    Json(LikeStatus { liked })
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>> {
    Ok(Json(
        state
            .catalog
            .toggle_beat_like(&id, &caller.uid, Utc::now())
            .await?,
    ))
}
