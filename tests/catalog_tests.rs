// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beat catalog and storage migration tests against in-memory backends.

use chrono::Utc;
use std::sync::Arc;
use studio_booking::db::{CatalogStore, MemoryDb};
use studio_booking::models::beat::UpsertAction;
use studio_booking::models::{BeatUpdate, MusicStyle, NewBeat};
use studio_booking::services::{BeatCatalog, CatalogMigrator};
use studio_booking::storage::{MemoryObjectStore, ObjectStore};

mod common;
use common::beat_doc;

struct Fixture {
    catalog: BeatCatalog,
    migrator: CatalogMigrator,
    db: Arc<MemoryDb>,
    objects: Arc<MemoryObjectStore>,
}

fn fixture() -> Fixture {
    let db = Arc::new(MemoryDb::new());
    let objects = Arc::new(MemoryObjectStore::new());
    Fixture {
        catalog: BeatCatalog::new(db.clone(), objects.clone()),
        migrator: CatalogMigrator::new(db.clone(), objects.clone(), "43 Art"),
        db,
        objects,
    }
}

/// Seed a valid record together with its audio object.
fn seed(f: &Fixture, id: &str, title: &str, plays: u64, created_at: &str) {
    f.db.seed_beat(beat_doc(id, title, plays, created_at));
    f.objects
        .put(&format!("beats/{id}.mp3"), "audio/mpeg", &[]);
}

// ═══════════════════════════════════════════════════════════════════════════
// LISTINGS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_listing_resolves_urls() {
    let f = fixture();
    seed(&f, "b1", "Night Drive", 0, "2030-01-01T00:00:00Z");

    let listing = f.catalog.get_all_beats().await.unwrap();
    assert_eq!(listing.beats.len(), 1);
    assert!(listing.unavailable.is_empty());

    let view = &listing.beats[0];
    assert_eq!(view.beat.title, "Night Drive");
    assert_eq!(
        view.audio_url.as_deref(),
        Some("https://storage.test/beats/b1.mp3?token=test")
    );
    assert_eq!(view.image_url, None);
}

#[tokio::test]
async fn test_unresolvable_beat_is_reported_not_fatal() {
    let f = fixture();
    seed(&f, "b1", "Good", 0, "2030-01-01T00:00:00Z");
    seed(&f, "b2", "Broken", 0, "2030-01-02T00:00:00Z");
    f.objects.set_broken_urls(&["beats/b2.mp3"]);

    // A record without audioPath cannot be served either
    let mut invalid = beat_doc("b3", "No Audio", 0, "2030-01-03T00:00:00Z");
    invalid.audio_path = String::new();
    f.db.seed_beat(invalid);

    let listing = f.catalog.get_all_beats().await.unwrap();
    let ids: Vec<&str> = listing.beats.iter().map(|b| b.beat.id.as_str()).collect();
    assert_eq!(ids, vec!["b1"]);

    let mut failed: Vec<&str> = listing.unavailable.iter().map(|u| u.item.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["b2", "b3"]);
}

#[tokio::test]
async fn test_popular_and_latest_ordering() {
    let f = fixture();
    seed(&f, "a", "A", 5, "2030-01-01T00:00:00Z");
    seed(&f, "b", "B", 50, "2030-01-03T00:00:00Z");
    seed(&f, "c", "C", 20, "2030-01-02T00:00:00Z");

    let popular = f.catalog.get_popular_beats(2).await.unwrap();
    let ids: Vec<&str> = popular.beats.iter().map(|b| b.beat.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);

    let latest = f.catalog.get_latest_beats(6).await.unwrap();
    let ids: Vec<&str> = latest.beats.iter().map(|b| b.beat.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn test_search_is_case_insensitive_tag_match() {
    let f = fixture();
    seed(&f, "a", "A", 0, "2030-01-01T00:00:00Z");

    let hits = f.catalog.search_beats("DARK").await.unwrap();
    assert_eq!(hits.beats.len(), 1);

    let misses = f.catalog.search_beats("jazz").await.unwrap();
    assert!(misses.beats.is_empty());

    f.db.set_offline(true);
    let err = f.catalog.search_beats("dark").await.unwrap_err();
    assert_eq!(err.code(), "SEARCH_ERROR");
}

#[tokio::test]
async fn test_get_beat_by_id_degrades_missing_urls() {
    let f = fixture();
    let mut doc = beat_doc("b1", "Cover Missing", 0, "2030-01-01T00:00:00Z");
    doc.image_path = Some("beats/covers/b1.jpg".to_string());
    f.db.seed_beat(doc);
    f.objects.put("beats/b1.mp3", "audio/mpeg", &[]);

    let view = f.catalog.get_beat_by_id("b1").await.unwrap();
    assert!(view.audio_url.is_some());
    assert_eq!(view.image_url, None);

    let err = f.catalog.get_beat_by_id("nope").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

// ═══════════════════════════════════════════════════════════════════════════
// ADMIN EDITS AND COUNTERS
// ═══════════════════════════════════════════════════════════════════════════

fn new_beat() -> NewBeat {
    NewBeat {
        title: "Fresh".to_string(),
        producer: "43 Art".to_string(),
        price: 19.0,
        style: MusicStyle::Drill,
        duration: 150,
        bpm: Some(142),
        audio_path: "beats/fresh.mp3".to_string(),
        image_path: None,
        tags: vec!["UK".to_string(), " drill ".to_string()],
    }
}

#[tokio::test]
async fn test_add_update_delete_beat() {
    let f = fixture();
    f.objects.put("beats/fresh.mp3", "audio/mpeg", &[]);

    let id = f.catalog.add_beat(new_beat(), Utc::now()).await.unwrap();
    let stored = f.db.get_beat(&id).await.unwrap().unwrap();
    assert_eq!(stored.plays, 0);
    assert_eq!(stored.likes, 0);
    assert_eq!(stored.tags, vec!["drill", "uk"]);

    let update = BeatUpdate {
        price: Some(25.0),
        ..Default::default()
    };
    let updated = f.catalog.update_beat(&id, update, Utc::now()).await.unwrap();
    assert_eq!(updated.price, 25.0);
    assert_eq!(updated.title, "Fresh");

    f.catalog.delete_beat(&id).await.unwrap();
    assert!(f.db.get_beat(&id).await.unwrap().is_none());
    assert!(!f.objects.contains("beats/fresh.mp3"));
}

#[tokio::test]
async fn test_invalid_new_beat_is_rejected() {
    let f = fixture();
    let mut beat = new_beat();
    beat.title = String::new();

    let err = f.catalog.add_beat(beat, Utc::now()).await.unwrap_err();
    assert_eq!(err.code(), "BAD_REQUEST");
    assert_eq!(f.db.beat_count(), 0);
}

#[tokio::test]
async fn test_plays_and_likes() {
    let f = fixture();
    seed(&f, "b1", "Counter", 0, "2030-01-01T00:00:00Z");

    assert_eq!(f.catalog.update_beat_plays("b1").await.unwrap(), 1);
    assert_eq!(f.catalog.update_beat_plays("b1").await.unwrap(), 2);

    let liked = f.catalog.toggle_beat_like("b1", "u1", Utc::now()).await.unwrap();
    assert!(liked.liked);
    assert_eq!(liked.likes, 1);
    assert!(f.catalog.get_beat_like_status("b1", "u1").await);

    let unliked = f.catalog.toggle_beat_like("b1", "u1", Utc::now()).await.unwrap();
    assert!(!unliked.liked);
    assert_eq!(unliked.likes, 0);
    assert!(!f.catalog.get_beat_like_status("b1", "u1").await);

    // Lookup failures read as "not liked"
    f.catalog.toggle_beat_like("b1", "u1", Utc::now()).await.unwrap();
    f.db.set_offline(true);
    assert!(!f.catalog.get_beat_like_status("b1", "u1").await);
}

#[tokio::test]
async fn test_concurrent_plays_are_all_counted() {
    let f = fixture();
    seed(&f, "b1", "Hot", 0, "2030-01-01T00:00:00Z");
    let catalog = Arc::new(f.catalog);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let catalog = catalog.clone();
            tokio::spawn(async move { catalog.update_beat_plays("b1").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(f.db.get_beat("b1").await.unwrap().unwrap().plays, 20);
}

// ═══════════════════════════════════════════════════════════════════════════
// MIGRATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_migration_creates_records_from_storage() {
    let f = fixture();
    f.objects.put(
        "beats/summer-night.mp3",
        "audio/mpeg",
        &[("producer", "Kid Nova"), ("style", "Afro"), ("price", "49.5")],
    );
    f.objects.put("beats/covers/summer-night.png", "image/png", &[]);
    f.objects.put("beats/notes.txt", "text/plain", &[]);
    f.objects.put("beats/covers/other.jpg", "image/jpeg", &[]);

    let report = f.migrator.migrate(Utc::now()).await.unwrap();

    assert_eq!(report.succeeded.len(), 1);
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, vec!["beats/notes.txt".to_string()]);

    let migrated = &report.succeeded[0];
    assert_eq!(migrated.title, "summer night");
    assert_eq!(migrated.action, UpsertAction::Created);
    assert_eq!(
        migrated.image_path.as_deref(),
        Some("beats/covers/summer-night.png")
    );

    let doc = f.db.get_beat(&migrated.beat_id).await.unwrap().unwrap();
    assert_eq!(doc.producer, "Kid Nova");
    assert_eq!(doc.style, "Afro");
    assert_eq!(doc.price, 49.5);
    assert_eq!(doc.duration, 0);
    assert_eq!(doc.audio_path, "beats/summer-night.mp3");
}

#[tokio::test]
async fn test_migration_rerun_updates_and_keeps_counters() {
    let f = fixture();
    f.objects
        .put("beats/loop.wav", "audio/wav", &[("title", "Loop")]);

    let first = f.migrator.migrate(Utc::now()).await.unwrap();
    let id = first.succeeded[0].beat_id.clone();
    f.db.increment_plays(&id).await.unwrap();

    let second = f.migrator.migrate(Utc::now()).await.unwrap();
    assert_eq!(second.succeeded[0].action, UpsertAction::Updated);
    assert_eq!(second.succeeded[0].beat_id, id);
    assert_eq!(f.db.beat_count(), 1);

    let doc = f.db.get_beat(&id).await.unwrap().unwrap();
    assert_eq!(doc.plays, 1);
    assert_eq!(doc.producer, "43 Art");
    assert_eq!(doc.style, "Trap");
}

#[tokio::test]
async fn test_migration_ignores_non_finite_prices() {
    let f = fixture();
    f.objects
        .put("beats/nan.mp3", "audio/mpeg", &[("price", "NaN")]);
    f.objects
        .put("beats/inf.mp3", "audio/mpeg", &[("price", "inf")]);

    let report = f.migrator.migrate(Utc::now()).await.unwrap();
    assert_eq!(report.succeeded.len(), 2);

    for migrated in &report.succeeded {
        let doc = f.db.get_beat(&migrated.beat_id).await.unwrap().unwrap();
        assert_eq!(doc.price, 0.0);
    }

    // Only migrated beats are listed
    let listing = f.catalog.get_all_beats().await.unwrap();
    assert_eq!(listing.beats.len(), 2);
    assert!(listing.unavailable.is_empty());
}

#[tokio::test]
async fn test_migration_reports_bad_files_and_continues() {
    let f = fixture();
    f.objects.put("beats/a.mp3", "audio/mpeg", &[]);
    f.objects.put("beats/b.mp3", "audio/mpeg", &[]);
    f.objects.set_broken_urls(&["beats/a.mp3"]);

    let report = f.migrator.migrate(Utc::now()).await.unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].item, "beats/b.mp3");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item, "beats/a.mp3");
}

#[tokio::test]
async fn test_migration_aborts_when_catalog_not_writable() {
    let f = fixture();
    f.objects.put("beats/a.mp3", "audio/mpeg", &[]);
    f.db.set_offline(true);

    let err = f.migrator.migrate(Utc::now()).await.unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn test_migration_check_is_read_only() {
    let f = fixture();
    seed(&f, "b1", "One", 0, "2030-01-01T00:00:00Z");
    f.objects.put("beats/two.mp3", "audio/mpeg", &[]);

    let check = f.migrator.check().await.unwrap();
    assert_eq!(check.storage_objects, 2);
    assert_eq!(check.catalog_records, 1);
    assert_eq!(check.records[0].title, "One");
    assert_eq!(f.db.beat_count(), 1);

    // Object store still lists the same files
    assert_eq!(f.objects.list("beats/").await.unwrap().len(), 2);
}
