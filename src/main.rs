// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Studio Booking API Server
//!
//! Serves session booking for the studio calendar and the beat catalog,
//! backed by Firestore and Cloud Storage.

use std::sync::Arc;
use studio_booking::{
    config::Config,
    db::FirestoreDb,
    services::{BookingNotifier, FirebaseTokenVerifier, MailNotifier, NoopNotifier},
    storage::GcsObjectStore,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Studio Booking API");

    let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);

    let objects = Arc::new(
        GcsObjectStore::new(&config.storage_bucket, config.download_url_ttl).await?,
    );
    tracing::info!(bucket = %config.storage_bucket, "Cloud Storage client initialized");

    let token_verifier = Arc::new(FirebaseTokenVerifier::new(&config.firebase_project_id)?);

    let notifier: Arc<dyn BookingNotifier> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(server = %smtp.server, "Booking confirmations enabled");
            Arc::new(MailNotifier::new(smtp, &config.studio_name, &config.app_url))
        }
        None => {
            tracing::warn!("SMTP_SERVER not set, booking confirmations disabled");
            Arc::new(NoopNotifier)
        }
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        token_verifier,
        db,
        objects,
        notifier,
    ));

    let app = studio_booking::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("studio_booking=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
