// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beat catalog: listings with resolved download URLs, admin edits, and
//! play/like counters.

use crate::db::{BeatOrder, CatalogStore};
use crate::error::AppError;
use crate::models::{
    Beat, BeatDocument, BeatListing, BeatUpdate, BeatView, ItemFailure, LikeToggle, NewBeat,
};
use crate::storage::ObjectStore;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use validator::Validate;

/// URL resolutions in flight per listing.
const MAX_CONCURRENT_URLS: usize = 16;

pub const DEFAULT_POPULAR_LIMIT: u32 = 5;
pub const DEFAULT_LATEST_COUNT: u32 = 6;

pub struct BeatCatalog {
    store: Arc<dyn CatalogStore>,
    objects: Arc<dyn ObjectStore>,
}

impl BeatCatalog {
    pub fn new(store: Arc<dyn CatalogStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    pub async fn get_all_beats(&self) -> Result<BeatListing, AppError> {
        let docs = self
            .store
            .list_beats(BeatOrder::Unordered, None)
            .await
            .map_err(|e| e.during(AppError::Fetch))?;
        Ok(self.resolve_all(docs).await)
    }

    /// Most played first.
    pub async fn get_popular_beats(&self, limit: u32) -> Result<BeatListing, AppError> {
        let docs = self
            .store
            .list_beats(BeatOrder::MostPlayed, Some(limit))
            .await
            .map_err(|e| e.during(AppError::Fetch))?;
        Ok(self.resolve_all(docs).await)
    }

    /// Newest first.
    pub async fn get_latest_beats(&self, count: u32) -> Result<BeatListing, AppError> {
        let docs = self
            .store
            .list_beats(BeatOrder::Newest, Some(count))
            .await
            .map_err(|e| e.during(AppError::Fetch))?;
        Ok(self.resolve_all(docs).await)
    }

    /// Beats tagged with `term` (case-insensitive).
    pub async fn search_beats(&self, term: &str) -> Result<BeatListing, AppError> {
        let tag = term.trim().to_lowercase();
        if tag.is_empty() {
            return Ok(BeatListing::default());
        }
        let docs = self
            .store
            .beats_with_tag(&tag)
            .await
            .map_err(|e| e.during(AppError::Search))?;
        Ok(self.resolve_all(docs).await)
    }

    /// A single beat. Unresolvable assets leave their URL empty.
    pub async fn get_beat_by_id(&self, id: &str) -> Result<BeatView, AppError> {
        let doc = self
            .store
            .get_beat(id)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .ok_or_else(|| AppError::NotFound(format!("beat {id}")))?;
        let beat = Beat::try_from(doc).map_err(AppError::Fetch)?;

        let audio_url = self.try_url(&beat.id, &beat.audio_path).await;
        let image_url = match &beat.image_path {
            Some(path) => self.try_url(&beat.id, path).await,
            None => None,
        };

        Ok(BeatView {
            beat,
            audio_url,
            image_url,
        })
    }

    /// The beats listed in `ids`, in that order. Missing records are
    /// reported as unavailable.
    pub async fn get_beats_by_ids<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a String>,
    ) -> Result<BeatListing, AppError> {
        let mut docs = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match self
                .store
                .get_beat(id)
                .await
                .map_err(|e| e.during(AppError::Fetch))?
            {
                Some(doc) => docs.push(doc),
                None => missing.push(ItemFailure {
                    item: id.clone(),
                    reason: "beat no longer exists".to_string(),
                }),
            }
        }

        let mut listing = self.resolve_all(docs).await;
        listing.unavailable.extend(missing);
        Ok(listing)
    }

    /// Insert a record with zeroed counters; returns its ID.
    pub async fn add_beat(&self, beat: NewBeat, now: DateTime<Utc>) -> Result<String, AppError> {
        beat.validate()?;

        let doc = BeatDocument::from_new(uuid::Uuid::new_v4().to_string(), &beat, now);
        self.store
            .insert_beat(&doc)
            .await
            .map_err(|e| e.during(AppError::Add))?;

        tracing::info!(beat_id = %doc.id, title = %doc.title, "Beat added");
        Ok(doc.id)
    }

    pub async fn update_beat(
        &self,
        id: &str,
        update: BeatUpdate,
        now: DateTime<Utc>,
    ) -> Result<Beat, AppError> {
        update.validate()?;

        let doc = self
            .store
            .update_beat(id, &update, now)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        tracing::info!(beat_id = id, "Beat updated");
        Beat::try_from(doc).map_err(AppError::Update)
    }

    /// Remove the assets (best-effort), then the record.
    pub async fn delete_beat(&self, id: &str) -> Result<(), AppError> {
        let doc = self
            .store
            .get_beat(id)
            .await
            .map_err(|e| e.during(AppError::Delete))?
            .ok_or_else(|| AppError::NotFound(format!("beat {id}")))?;

        let assets = std::iter::once(doc.audio_path.as_str())
            .chain(doc.image_path.as_deref())
            .filter(|path| !path.is_empty());
        for path in assets {
            if let Err(e) = self.objects.delete(path).await {
                tracing::warn!(beat_id = id, path, error = %e, "Failed to delete beat asset");
            }
        }

        self.store
            .delete_beat(id)
            .await
            .map_err(|e| e.during(AppError::Delete))?;

        tracing::info!(beat_id = id, "Beat deleted");
        Ok(())
    }

    pub async fn update_beat_plays(&self, id: &str) -> Result<u64, AppError> {
        self.store
            .increment_plays(id)
            .await
            .map_err(|e| e.during(AppError::Update))
    }

    pub async fn toggle_beat_like(
        &self,
        beat_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LikeToggle, AppError> {
        let toggle = self
            .store
            .toggle_like(beat_id, user_id, now)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        tracing::debug!(beat_id, user_id, liked = toggle.liked, "Like toggled");
        Ok(toggle)
    }

    /// Whether `user_id` likes the beat. Lookup failures read as "not liked".
    pub async fn get_beat_like_status(&self, beat_id: &str, user_id: &str) -> bool {
        match self.store.has_liked(beat_id, user_id).await {
            Ok(liked) => liked,
            Err(e) => {
                tracing::warn!(beat_id, user_id, error = %e, "Like status lookup failed");
                false
            }
        }
    }

    /// Parse and resolve every document, keeping store order.
    pub(crate) async fn resolve_all(&self, docs: Vec<BeatDocument>) -> BeatListing {
        let results: Vec<Result<BeatView, ItemFailure>> = stream::iter(docs)
            .map(|doc| self.resolve(doc))
            .buffered(MAX_CONCURRENT_URLS)
            .collect()
            .await;

        let mut listing = BeatListing::default();
        for result in results {
            match result {
                Ok(view) => listing.beats.push(view),
                Err(failure) => {
                    tracing::warn!(
                        beat_id = %failure.item,
                        reason = %failure.reason,
                        "Beat left out of listing"
                    );
                    listing.unavailable.push(failure);
                }
            }
        }
        listing
    }

    async fn resolve(&self, doc: BeatDocument) -> Result<BeatView, ItemFailure> {
        let item = doc.id.clone();
        let beat = Beat::try_from(doc).map_err(|reason| ItemFailure {
            item: item.clone(),
            reason,
        })?;

        let fail = |e: AppError| ItemFailure {
            item: item.clone(),
            reason: e.to_string(),
        };
        let audio_url = self.objects.download_url(&beat.audio_path).await.map_err(fail)?;
        let image_url = match &beat.image_path {
            Some(path) => Some(self.objects.download_url(path).await.map_err(fail)?),
            None => None,
        };

        Ok(BeatView {
            beat,
            audio_url: Some(audio_url),
            image_url,
        })
    }

    async fn try_url(&self, beat_id: &str, path: &str) -> Option<String> {
        match self.objects.download_url(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(beat_id, path, error = %e, "Could not resolve asset URL");
                None
            }
        }
    }
}
