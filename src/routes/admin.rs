// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog maintenance routes (administrators only).

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{MigrationCheck, MigrationReport};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/migrate-beats", post(migrate_beats))
        .route("/api/admin/migration-check", get(migration_check))
}

/// Import every audio file under `beats/` into the catalog.
async fn migrate_beats(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<MigrationReport>> {
    tracing::info!(by = %admin.uid, "Beat migration requested");
    Ok(Json(state.migrator.migrate(Utc::now()).await?))
}

async fn migration_check(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<MigrationCheck>> {
    Ok(Json(state.migrator.check().await?))
}
