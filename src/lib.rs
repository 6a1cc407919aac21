// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Studio booking and beat marketplace backend.
//!
//! This crate provides the API behind a recording studio's website: hourly
//! session booking against a weekly calendar, and a catalog of beats stored
//! in Cloud Storage with play and like counters.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use db::{BookingStore, CatalogStore, ProfileStore};
use services::{
    BeatCatalog, BookingNotifier, BookingRepository, CatalogMigrator, FirebaseTokenVerifier,
    ProfileService,
};
use std::sync::Arc;
use storage::ObjectStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
    pub bookings: BookingRepository,
    pub catalog: Arc<BeatCatalog>,
    pub migrator: CatalogMigrator,
    pub profiles: ProfileService,
}

impl AppState {
    /// Wire the repositories to one document store and one object store.
    pub fn new<D>(
        config: Config,
        token_verifier: Arc<FirebaseTokenVerifier>,
        db: Arc<D>,
        objects: Arc<dyn ObjectStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self
    where
        D: BookingStore + CatalogStore + ProfileStore + 'static,
    {
        let catalog = Arc::new(BeatCatalog::new(db.clone(), objects.clone()));

        Self {
            bookings: BookingRepository::new(db.clone(), db.clone(), notifier),
            migrator: CatalogMigrator::new(db.clone(), objects.clone(), &config.default_producer),
            profiles: ProfileService::new(db.clone(), db, objects, catalog.clone()),
            catalog,
            token_verifier,
            config,
        }
    }
}
