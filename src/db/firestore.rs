// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Bookings (plus per-slot claim documents guarding double booking)
//! - Beats (catalog records and their like markers)
//! - Users (profiles and favorites)
//!
//! Multi-document mutations run inside `run_transaction`, which retries on
//! contention. Business-rule rejections are returned as the transaction's
//! value so that nothing is written and the rejection reaches the caller
//! unchanged.

use crate::db::{
    claim_delta, collections, first_conflict, BeatOrder, BookingStore, CatalogStore,
    ProfileStore, UpsertOutcome, PROBE_DOCUMENT_ID,
};
use crate::error::AppError;
use crate::models::beat::LikeMarker;
use crate::models::booking::{slot_key, SlotClaim};
use crate::models::{
    BeatDocument, BeatUpdate, Booking, BookingChange, BookingDocument, Caller, LikeToggle,
    ProfileUpdate, UserProfile,
};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::FutureExt;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

fn tx_failed(e: FirestoreError) -> AppError {
    AppError::Database(format!("Transaction failed: {}", e))
}

fn parse_bookings(docs: Vec<BookingDocument>) -> Vec<Booking> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match Booking::try_from(doc) {
                Ok(booking) => Some(booking),
                Err(reason) => {
                    tracing::warn!(booking_id = %id, reason = %reason, "Skipping invalid booking document");
                    None
                }
            }
        })
        .collect()
}

fn parse_booking(doc: BookingDocument) -> Result<Booking, AppError> {
    Booking::try_from(doc).map_err(|reason| AppError::Database(format!("Invalid booking: {reason}")))
}

// ─── Booking Operations ──────────────────────────────────────

#[async_trait]
impl BookingStore for FirestoreDb {
    async fn create_booking(&self, booking: &Booking) -> Result<(), AppError> {
        let doc = BookingDocument::from(booking);
        let slots = booking.occupied_slots();
        let date = booking.date;

        let outcome = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let doc = doc.clone();
                let slots = slots.clone();
                let booking_id = doc.id.clone();

                async move {
                    // Claim documents are the lock; reading them registers
                    // them for conflict detection.
                    for slot in &slots {
                        let claim: Option<SlotClaim> = db
                            .fluent()
                            .select()
                            .by_id_in(collections::BOOKING_SLOTS)
                            .obj()
                            .one(&slot_key(date, *slot))
                            .await?;
                        if claim.is_some() {
                            return Ok(Err(AppError::SlotAlreadyBooked(format!("{date} {slot}"))));
                        }
                    }

                    // Bookings written before claims existed
                    let same_day: Vec<BookingDocument> = db
                        .fluent()
                        .select()
                        .from(collections::BOOKINGS)
                        .filter(|q| q.field("date").eq(doc.date.clone()))
                        .obj()
                        .query()
                        .await?;
                    if let Some(slot) = first_conflict(&slots, &parse_bookings(same_day), &booking_id)
                    {
                        return Ok(Err(AppError::SlotAlreadyBooked(format!("{date} {slot}"))));
                    }

                    for slot in &slots {
                        let claim = SlotClaim {
                            booking_id: booking_id.clone(),
                            date: doc.date.clone(),
                            start_time: slot.to_string(),
                        };
                        db.fluent()
                            .update()
                            .in_col(collections::BOOKING_SLOTS)
                            .document_id(slot_key(date, *slot))
                            .object(&claim)
                            .add_to_transaction(transaction)?;
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::BOOKINGS)
                        .document_id(&booking_id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(()))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?;

        if outcome.is_ok() {
            tracing::info!(
                booking_id = %booking.id,
                date = %date,
                slots = slots.len(),
                "Booking stored with slot claims"
            );
        }
        outcome
    }

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let doc: Option<BookingDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BOOKINGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        doc.map(parse_booking).transpose()
    }

    async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let date = date.format("%Y-%m-%d").to_string();
        let docs: Vec<BookingDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BOOKINGS)
            .filter(|q| q.field("date").eq(date.clone()))
            .order_by([("startTime", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(parse_bookings(docs))
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let docs: Vec<BookingDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BOOKINGS)
            .filter(|q| q.field("userId").eq(user_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut bookings = parse_bookings(docs);
        bookings.sort_by_key(|b| (b.date, b.start_time));
        Ok(bookings)
    }

    async fn modify_booking(
        &self,
        id: &str,
        caller: &Caller,
        change: &BookingChange,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let id = id.to_string();
                let caller = caller.clone();
                let change = change.clone();

                async move {
                    let doc: Option<BookingDocument> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BOOKINGS)
                        .obj()
                        .one(&id)
                        .await?;
                    let Some(doc) = doc else {
                        return Ok(Err(AppError::NotFound(format!("booking {id}"))));
                    };
                    let current = match parse_booking(doc) {
                        Ok(current) => current,
                        Err(e) => return Ok(Err(e)),
                    };
                    let next = match current.apply(&caller, &change, now) {
                        Ok(next) => next,
                        Err(e) => return Ok(Err(e)),
                    };
                    if next == current {
                        return Ok(Ok(next));
                    }

                    let (claim, release) = claim_delta(&current, &next);
                    for slot in &claim {
                        let held: Option<SlotClaim> = db
                            .fluent()
                            .select()
                            .by_id_in(collections::BOOKING_SLOTS)
                            .obj()
                            .one(&slot_key(next.date, *slot))
                            .await?;
                        if held.is_some_and(|c| c.booking_id != id) {
                            return Ok(Err(AppError::SlotAlreadyBooked(format!(
                                "{} {}",
                                next.date, slot
                            ))));
                        }
                    }

                    let doc = BookingDocument::from(&next);
                    for slot in &claim {
                        let claim_doc = SlotClaim {
                            booking_id: id.clone(),
                            date: doc.date.clone(),
                            start_time: slot.to_string(),
                        };
                        db.fluent()
                            .update()
                            .in_col(collections::BOOKING_SLOTS)
                            .document_id(slot_key(next.date, *slot))
                            .object(&claim_doc)
                            .add_to_transaction(transaction)?;
                    }
                    for slot in &release {
                        db.fluent()
                            .delete()
                            .from(collections::BOOKING_SLOTS)
                            .document_id(slot_key(current.date, *slot))
                            .add_to_transaction(transaction)?;
                    }
                    db.fluent()
                        .update()
                        .in_col(collections::BOOKINGS)
                        .document_id(&id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(next))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }
}

// ─── Beat Operations ─────────────────────────────────────────

#[async_trait]
impl CatalogStore for FirestoreDb {
    async fn list_beats(
        &self,
        order: BeatOrder,
        limit: Option<u32>,
    ) -> Result<Vec<BeatDocument>, AppError> {
        let mut query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BEATS);

        match order {
            BeatOrder::Unordered => {}
            BeatOrder::MostPlayed => {
                query = query.order_by([("plays", firestore::FirestoreQueryDirection::Descending)])
            }
            BeatOrder::Newest => {
                query = query
                    .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            }
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn beats_with_tag(&self, tag: &str) -> Result<Vec<BeatDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BEATS)
            .filter(|q| q.field("tags").array_contains(tag))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_beat(&self, id: &str) -> Result<Option<BeatDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BEATS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_beat(&self, beat: &BeatDocument) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BEATS)
            .document_id(&beat.id)
            .object(beat)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_beat(
        &self,
        id: &str,
        update: &BeatUpdate,
        now: DateTime<Utc>,
    ) -> Result<BeatDocument, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let id = id.to_string();
                let update = update.clone();

                async move {
                    let doc: Option<BeatDocument> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BEATS)
                        .obj()
                        .one(&id)
                        .await?;
                    let Some(mut doc) = doc else {
                        return Ok(Err(AppError::NotFound(format!("beat {id}"))));
                    };

                    doc.apply(&update, now);
                    db.fluent()
                        .update()
                        .in_col(collections::BEATS)
                        .document_id(&id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(doc))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn delete_beat(&self, id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::BEATS, id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let markers: Vec<LikeMarker> = client
            .fluent()
            .select()
            .from(collections::LIKES)
            .parent(&parent_path)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for chunk in markers.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for marker in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::LIKES)
                    .document_id(&marker.user_id)
                    .parent(&parent_path)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add like deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit like deletion: {}", e))
            })?;
        }

        client
            .fluent()
            .delete()
            .from(collections::BEATS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(beat_id = id, likes = markers.len(), "Deleted beat record");
        Ok(())
    }

    async fn increment_plays(&self, id: &str) -> Result<u64, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let id = id.to_string();

                async move {
                    let doc: Option<BeatDocument> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BEATS)
                        .obj()
                        .one(&id)
                        .await?;
                    let Some(mut doc) = doc else {
                        return Ok(Err(AppError::NotFound(format!("beat {id}"))));
                    };

                    doc.plays += 1;
                    db.fluent()
                        .update()
                        .in_col(collections::BEATS)
                        .document_id(&id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(doc.plays))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn toggle_like(
        &self,
        beat_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LikeToggle, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let beat_id = beat_id.to_string();
                let user_id = user_id.to_string();

                async move {
                    let doc: Option<BeatDocument> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BEATS)
                        .obj()
                        .one(&beat_id)
                        .await?;
                    let Some(mut doc) = doc else {
                        return Ok(Err(AppError::NotFound(format!("beat {beat_id}"))));
                    };

                    let parent_path = db.parent_path(collections::BEATS, &beat_id)?;
                    let marker: Option<LikeMarker> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::LIKES)
                        .parent(&parent_path)
                        .obj()
                        .one(&user_id)
                        .await?;

                    let liked = marker.is_none();
                    if liked {
                        let marker = LikeMarker {
                            user_id: user_id.clone(),
                            created_at: format_utc_rfc3339(now),
                        };
                        db.fluent()
                            .update()
                            .in_col(collections::LIKES)
                            .document_id(&user_id)
                            .parent(&parent_path)
                            .object(&marker)
                            .add_to_transaction(transaction)?;
                        doc.likes += 1;
                    } else {
                        db.fluent()
                            .delete()
                            .from(collections::LIKES)
                            .document_id(&user_id)
                            .parent(&parent_path)
                            .add_to_transaction(transaction)?;
                        doc.likes = doc.likes.saturating_sub(1);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::BEATS)
                        .document_id(&beat_id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(LikeToggle {
                        liked,
                        likes: doc.likes,
                    }))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn has_liked(&self, beat_id: &str, user_id: &str) -> Result<bool, AppError> {
        let client = self.get_client()?;
        let parent_path = client
            .parent_path(collections::BEATS, beat_id)
            .map_err(|e| AppError::Database(e.to_string()))?;

        let marker: Option<LikeMarker> = client
            .fluent()
            .select()
            .by_id_in(collections::LIKES)
            .parent(&parent_path)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(marker.is_some())
    }

    async fn upsert_by_title(&self, beat: &BeatDocument) -> Result<UpsertOutcome, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let beat = beat.clone();

                async move {
                    let title = beat.title.clone();
                    let existing: Vec<BeatDocument> = db
                        .fluent()
                        .select()
                        .from(collections::BEATS)
                        .filter(|q| q.field("title").eq(title.clone()))
                        .limit(1)
                        .obj()
                        .query()
                        .await?;

                    let (doc, outcome) = match existing.into_iter().next() {
                        Some(current) => {
                            let id = current.id.clone();
                            let doc = BeatDocument {
                                id: id.clone(),
                                plays: current.plays,
                                likes: current.likes,
                                tags: current.tags,
                                bpm: current.bpm,
                                ..beat
                            };
                            (doc, UpsertOutcome::Updated(id))
                        }
                        None => {
                            let id = beat.id.clone();
                            (beat, UpsertOutcome::Created(id))
                        }
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::BEATS)
                        .document_id(&doc.id)
                        .object(&doc)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(outcome))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn probe_write(&self) -> Result<(), AppError> {
        let client = self.get_client()?;
        let probe = LikeMarker {
            user_id: PROBE_DOCUMENT_ID.to_string(),
            created_at: format_utc_rfc3339(Utc::now()),
        };

        let _: () = client
            .fluent()
            .update()
            .in_col(collections::MIGRATION_PROBES)
            .document_id(PROBE_DOCUMENT_ID)
            .object(&probe)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("Catalog is not writable: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::MIGRATION_PROBES)
            .document_id(PROBE_DOCUMENT_ID)
            .execute()
            .await
            .map_err(|e| AppError::Database(format!("Failed to remove probe document: {}", e)))?;

        Ok(())
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl ProfileStore for FirestoreDb {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let uid = uid.to_string();
                let update = update.clone();

                async move {
                    let profile: Option<UserProfile> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&uid)
                        .await?;
                    let Some(mut profile) = profile else {
                        return Ok(Err(AppError::NotFound(format!("profile {uid}"))));
                    };

                    profile.apply(&update, now);
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&uid)
                        .object(&profile)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(profile))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn create_profile_if_absent(
        &self,
        profile: &UserProfile,
    ) -> Result<UserProfile, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let profile = profile.clone();

                async move {
                    let existing: Option<UserProfile> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&profile.id)
                        .await?;
                    if let Some(existing) = existing {
                        return Ok(Ok(existing));
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&profile.id)
                        .object(&profile)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(profile))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }

    async fn toggle_favorite(
        &self,
        uid: &str,
        beat_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.get_client()?
            .run_transaction(|db, transaction| {
                let uid = uid.to_string();
                let beat_id = beat_id.to_string();

                async move {
                    let profile: Option<UserProfile> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&uid)
                        .await?;
                    let Some(mut profile) = profile else {
                        return Ok(Err(AppError::NotFound(format!("profile {uid}"))));
                    };

                    let favorite = profile.toggle_favorite(&beat_id, now);
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&uid)
                        .object(&profile)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Ok(favorite))
                }
                .boxed()
            })
            .await
            .map_err(tx_failed)?
    }
}
