// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconcile audio files in the bucket with the beat catalog.
//!
//! Every audio object under `beats/` becomes (or refreshes) one catalog
//! record, matched by title. One bad file never aborts the run: it is
//! reported in the result and the next file is processed.

use crate::db::{BeatOrder, CatalogStore, UpsertOutcome};
use crate::error::AppError;
use crate::models::beat::{CatalogRecordSummary, MigratedBeat, UpsertAction};
use crate::models::{BeatDocument, ItemFailure, MigrationCheck, MigrationReport, MusicStyle};
use crate::storage::{ObjectStore, StoredObject, BEATS_PREFIX};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "m4a", "ogg", "flac", "aac"];

/// Folders searched for a cover, in order; `.jpg` is tried before `.png`.
const COVER_FOLDERS: [&str; 3] = ["beats/covers/", "beats/images/", "covers/"];
const COVER_EXTENSIONS: [&str; 2] = ["jpg", "png"];

pub struct CatalogMigrator {
    store: Arc<dyn CatalogStore>,
    objects: Arc<dyn ObjectStore>,
    default_producer: String,
}

impl CatalogMigrator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        objects: Arc<dyn ObjectStore>,
        default_producer: &str,
    ) -> Self {
        Self {
            store,
            objects,
            default_producer: default_producer.to_string(),
        }
    }

    /// Upsert a catalog record for every audio object under `beats/`.
    ///
    /// Fails up front if the catalog is not writable or the bucket cannot be
    /// listed; per-file problems end up in [`MigrationReport::failed`].
    pub async fn migrate(&self, now: DateTime<Utc>) -> Result<MigrationReport, AppError> {
        self.store.probe_write().await.map_err(|e| {
            tracing::error!(error = %e, "Catalog is not writable, aborting migration");
            AppError::PermissionDenied(format!("cannot write to the beat catalog: {e}"))
        })?;

        let objects = self
            .objects
            .list(BEATS_PREFIX)
            .await
            .map_err(|e| e.during(AppError::Fetch))?;

        tracing::info!(objects = objects.len(), "Starting beat migration");

        let mut report = MigrationReport::default();
        for object in objects {
            if !is_audio(&object) {
                tracing::debug!(path = %object.path, "Skipping non-audio object");
                report.skipped.push(object.path);
                continue;
            }

            match self.migrate_one(&object, now).await {
                Ok(migrated) => {
                    tracing::info!(
                        path = %migrated.item,
                        beat_id = %migrated.beat_id,
                        action = ?migrated.action,
                        "Beat migrated"
                    );
                    report.succeeded.push(migrated);
                }
                Err(e) => {
                    tracing::warn!(path = %object.path, error = %e, "Beat migration failed");
                    report.failed.push(ItemFailure {
                        item: object.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Beat migration finished"
        );
        Ok(report)
    }

    /// Compare the bucket with the catalog without writing anything.
    pub async fn check(&self) -> Result<MigrationCheck, AppError> {
        let storage_objects = self
            .objects
            .list(BEATS_PREFIX)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .len();
        let records: Vec<CatalogRecordSummary> = self
            .store
            .list_beats(BeatOrder::Unordered, None)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .into_iter()
            .map(|doc| CatalogRecordSummary {
                id: doc.id,
                title: doc.title,
                producer: doc.producer,
                audio_path: doc.audio_path,
            })
            .collect();

        Ok(MigrationCheck {
            storage_objects,
            catalog_records: records.len(),
            records,
        })
    }

    async fn migrate_one(
        &self,
        object: &StoredObject,
        now: DateTime<Utc>,
    ) -> Result<MigratedBeat, AppError> {
        // Listing only carries names; fetch the custom metadata.
        let object = self
            .objects
            .metadata(&object.path)
            .await?
            .ok_or_else(|| AppError::NotFound(object.path.clone()))?;
        let stem = file_stem(object.name());

        let image_path = self.find_cover(stem).await;
        if image_path.is_none() {
            tracing::debug!(path = %object.path, "No cover image found");
        }

        // The record is useless if its audio cannot be served.
        self.objects.download_url(&object.path).await?;

        let doc = self.document_for(&object, stem, image_path.clone(), now);
        let title = doc.title.clone();
        let (action, beat_id) = match self.store.upsert_by_title(&doc).await? {
            UpsertOutcome::Created(id) => (UpsertAction::Created, id),
            UpsertOutcome::Updated(id) => (UpsertAction::Updated, id),
        };

        Ok(MigratedBeat {
            item: object.path,
            beat_id,
            title,
            action,
            image_path,
        })
    }

    async fn find_cover(&self, stem: &str) -> Option<String> {
        for folder in COVER_FOLDERS {
            for ext in COVER_EXTENSIONS {
                let path = format!("{folder}{stem}.{ext}");
                match self.objects.metadata(&path).await {
                    Ok(Some(_)) => return Some(path),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(path = %path, error = %e, "Cover lookup failed");
                    }
                }
            }
        }
        None
    }

    fn document_for(
        &self,
        object: &StoredObject,
        stem: &str,
        image_path: Option<String>,
        now: DateTime<Utc>,
    ) -> BeatDocument {
        let meta = |key| custom_metadata(object, key);

        let style = meta("style")
            .and_then(|s| s.parse::<MusicStyle>().ok())
            .unwrap_or(MusicStyle::Trap);

        BeatDocument {
            id: uuid::Uuid::new_v4().to_string(),
            title: title_for(object, stem),
            producer: meta("producer")
                .unwrap_or(self.default_producer.as_str())
                .to_string(),
            style: style.to_string(),
            price: meta("price")
                .and_then(|p| p.parse::<f64>().ok())
                .filter(|p| p.is_finite())
                .unwrap_or(0.0),
            duration: meta("duration")
                .and_then(|d| d.parse::<f64>().ok())
                .map(|d| d.max(0.0).round() as u32)
                .unwrap_or(0),
            bpm: None,
            audio_path: object.path.clone(),
            image_path,
            tags: Vec::new(),
            plays: 0,
            likes: 0,
            created_at: format_utc_rfc3339(object.created_at.unwrap_or(now)),
            updated_at: Some(format_utc_rfc3339(now)),
        }
    }
}

/// File name up to the first dot.
fn file_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Non-blank custom metadata value.
fn custom_metadata<'a>(object: &'a StoredObject, key: &str) -> Option<&'a str> {
    object
        .custom_metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Custom `title` metadata, else the file stem with dashes as spaces.
fn title_for(object: &StoredObject, stem: &str) -> String {
    custom_metadata(object, "title")
        .map(str::to_string)
        .unwrap_or_else(|| stem.replace('-', " "))
}

fn is_audio(object: &StoredObject) -> bool {
    if object
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("audio/"))
    {
        return true;
    }
    object
        .name()
        .rsplit_once('.')
        .is_some_and(|(_, ext)| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
