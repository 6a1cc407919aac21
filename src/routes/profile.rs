// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes for the signed-in user's own profile and dashboard.

use crate::error::{AppError, Result};
use crate::middleware::RequireCaller;
use crate::models::{BeatListing, Booking, ProfileUpdate, UserProfile, UserStats};
use crate::routes::extract::ValidatedJson;
use crate::services::profiles::MAX_PHOTO_BYTES;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).patch(update_me))
        .route(
            "/api/me/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES)),
        )
        .route("/api/me/bookings", get(my_bookings))
        .route("/api/me/favorites", get(my_favorites))
        .route("/api/me/favorites/{beat_id}", post(toggle_favorite))
        .route("/api/me/stats", get(my_stats))
}

/// Current profile, created on first call.
async fn get_me(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.ensure_profile(&caller, Utc::now()).await?))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    ValidatedJson(update): ValidatedJson<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    Ok(Json(
        state
            .profiles
            .update_user_profile(&caller, update, Utc::now())
            .await?,
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PhotoResponse {
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

/// Raw image body; the `Content-Type` header names the format.
async fn upload_photo(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PhotoResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Content-Type header is required".to_string()))?;

    let photo_url = state
        .profiles
        .upload_profile_photo(&caller, body.to_vec(), content_type, Utc::now())
        .await?;
    Ok(Json(PhotoResponse { photo_url }))
}

async fn my_bookings(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(state.profiles.get_user_bookings(&caller).await?))
}

async fn my_favorites(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
) -> Result<Json<BeatListing>> {
    Ok(Json(
        state
            .profiles
            .get_favorite_beats(&caller, Utc::now())
            .await?,
    ))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FavoriteToggle {
    pub favorite: bool,
}

async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    Path(beat_id): Path<String>,
) -> Result<Json<FavoriteToggle>> {
    let favorite = state
        .profiles
        .toggle_favorite_beat(&caller, &beat_id, Utc::now())
        .await?;
    Ok(Json(FavoriteToggle { favorite }))
}

async fn my_stats(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
) -> Result<Json<UserStats>> {
    Ok(Json(
        state
            .profiles
            .get_user_stats(&caller, Utc::now().date_naive())
            .await?,
    ))
}
