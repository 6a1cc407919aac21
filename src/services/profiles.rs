// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profiles, favorites and the personal dashboard.

use crate::db::{BookingStore, ProfileStore};
use crate::error::AppError;
use crate::models::{BeatListing, Booking, Caller, ProfileUpdate, UserProfile, UserStats};
use crate::services::catalog::BeatCatalog;
use crate::storage::ObjectStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use validator::Validate;

/// Upper bound for profile photos.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub fn profile_photo_path(uid: &str) -> String {
    format!("users/{uid}/profile-photo")
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    bookings: Arc<dyn BookingStore>,
    objects: Arc<dyn ObjectStore>,
    catalog: Arc<BeatCatalog>,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        bookings: Arc<dyn BookingStore>,
        objects: Arc<dyn ObjectStore>,
        catalog: Arc<BeatCatalog>,
    ) -> Self {
        Self {
            profiles,
            bookings,
            objects,
            catalog,
        }
    }

    /// The caller's profile, created on first use.
    pub async fn ensure_profile(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AppError> {
        let fresh = UserProfile::for_caller(caller, now);
        let profile = self
            .profiles
            .create_profile_if_absent(&fresh)
            .await
            .map_err(|e| e.during(AppError::Fetch))?;

        if profile == fresh {
            tracing::info!(user_id = %caller.uid, "Profile created");
        }
        Ok(profile)
    }

    pub async fn get_user_profile(&self, uid: &str) -> Result<UserProfile, AppError> {
        let profile = self
            .profiles
            .get_profile(uid)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .ok_or_else(|| AppError::NotFound(format!("profile {uid}")))?;

        profile.validate_document().map_err(AppError::Fetch)?;
        Ok(profile)
    }

    pub async fn update_user_profile(
        &self,
        caller: &Caller,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AppError> {
        update.validate()?;

        self.ensure_profile(caller, now).await?;
        let profile = self
            .profiles
            .update_profile(&caller.uid, &update, now)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        tracing::info!(user_id = %caller.uid, "Profile updated");
        Ok(profile)
    }

    /// Store a new profile photo and point the profile at it.
    pub async fn upload_profile_photo(
        &self,
        caller: &Caller,
        data: Vec<u8>,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "profile photo must be an image, got {content_type}"
            )));
        }
        if data.is_empty() || data.len() > MAX_PHOTO_BYTES {
            return Err(AppError::BadRequest(format!(
                "profile photo must be between 1 and {MAX_PHOTO_BYTES} bytes"
            )));
        }

        let path = profile_photo_path(&caller.uid);
        self.objects
            .upload(&path, data, content_type)
            .await
            .map_err(|e| e.during(AppError::Update))?;
        let url = self
            .objects
            .download_url(&path)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        let update = ProfileUpdate {
            photo_url: Some(url.clone()),
            ..Default::default()
        };
        self.ensure_profile(caller, now).await?;
        self.profiles
            .update_profile(&caller.uid, &update, now)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        tracing::info!(user_id = %caller.uid, path = %path, "Profile photo uploaded");
        Ok(url)
    }

    /// Returns whether the beat is now a favorite.
    pub async fn toggle_favorite_beat(
        &self,
        caller: &Caller,
        beat_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.ensure_profile(caller, now).await?;
        self.profiles
            .toggle_favorite(&caller.uid, beat_id, now)
            .await
            .map_err(|e| e.during(AppError::Update))
    }

    pub async fn get_favorite_beats(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<BeatListing, AppError> {
        let profile = self.ensure_profile(caller, now).await?;
        self.catalog
            .get_beats_by_ids(profile.favorite_beats.iter())
            .await
    }

    /// The caller's pending and confirmed bookings, earliest first.
    pub async fn get_user_bookings(&self, caller: &Caller) -> Result<Vec<Booking>, AppError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .bookings_for_user(&caller.uid)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .into_iter()
            .filter(|b| b.status.is_active())
            .collect();
        bookings.sort_by_key(|b| (b.date, b.start_time));
        Ok(bookings)
    }

    pub async fn get_user_stats(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<UserStats, AppError> {
        let bookings = self.get_user_bookings(caller).await?;
        let favorite_beats = self
            .profiles
            .get_profile(&caller.uid)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .map(|p| p.favorite_beats.len())
            .unwrap_or(0);

        Ok(UserStats {
            total_bookings: bookings.len() as u32,
            upcoming_bookings: bookings.iter().filter(|b| b.date >= today).count() as u32,
            favorite_beats: favorite_beats as u32,
        })
    }
}
