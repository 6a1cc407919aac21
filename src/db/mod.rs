//! Database layer.
//!
//! Repositories talk to the document store through the traits below so the
//! Firestore client can be swapped for [`MemoryDb`] in tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::booking::{slot_span, SlotTime};
use crate::models::{
    Booking, BookingChange, BeatDocument, BeatUpdate, Caller, LikeToggle, ProfileUpdate,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Collection names as constants.
pub mod collections {
    pub const BOOKINGS: &str = "bookings";
    /// One document per claimed hourly slot, keyed `{date}_{HH:mm}`
    pub const BOOKING_SLOTS: &str = "booking_slots";
    pub const BEATS: &str = "beats";
    /// Subcollection of `beats/{id}`, keyed by user ID
    pub const LIKES: &str = "likes";
    pub const USERS: &str = "users";
    /// Scratch documents written to check access before a migration
    pub const MIGRATION_PROBES: &str = "migration_probes";
}

/// Document used to check write access before a catalog migration.
pub const PROBE_DOCUMENT_ID: &str = "_migration_probe";

/// Ordering for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatOrder {
    /// Store order
    Unordered,
    /// `plays` descending
    MostPlayed,
    /// `createdAt` descending
    Newest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(String),
    Updated(String),
}

/// Booking persistence. Mutations that touch slot claims are atomic.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert `booking` and claim every slot it occupies.
    ///
    /// Fails with `SlotAlreadyBooked` if any slot is held by an active booking.
    async fn create_booking(&self, booking: &Booking) -> Result<(), AppError>;

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError>;

    /// Every booking on `date`, whatever its status.
    async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError>;

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError>;

    /// Read, check and rewrite a booking in one transaction, adjusting its
    /// slot claims to match the result.
    async fn modify_booking(
        &self,
        id: &str,
        caller: &Caller,
        change: &BookingChange,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError>;
}

/// Beat catalog persistence. Documents are returned unparsed so callers can
/// report invalid records individually.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_beats(
        &self,
        order: BeatOrder,
        limit: Option<u32>,
    ) -> Result<Vec<BeatDocument>, AppError>;

    /// Records whose `tags` contain `tag` exactly.
    async fn beats_with_tag(&self, tag: &str) -> Result<Vec<BeatDocument>, AppError>;

    async fn get_beat(&self, id: &str) -> Result<Option<BeatDocument>, AppError>;

    async fn insert_beat(&self, beat: &BeatDocument) -> Result<(), AppError>;

    /// Merge `update` into an existing record; `NotFound` if absent.
    async fn update_beat(
        &self,
        id: &str,
        update: &BeatUpdate,
        now: DateTime<Utc>,
    ) -> Result<BeatDocument, AppError>;

    /// Remove a record together with its like markers.
    async fn delete_beat(&self, id: &str) -> Result<(), AppError>;

    /// Atomically add one play; returns the new count.
    async fn increment_plays(&self, id: &str) -> Result<u64, AppError>;

    /// Flip the caller's like marker and adjust `likes` in one transaction.
    async fn toggle_like(
        &self,
        beat_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LikeToggle, AppError>;

    async fn has_liked(&self, beat_id: &str, user_id: &str) -> Result<bool, AppError>;

    /// Insert `beat`, or overwrite the descriptive fields of the record with
    /// the same title while keeping its ID and counters.
    async fn upsert_by_title(&self, beat: &BeatDocument) -> Result<UpsertOutcome, AppError>;

    /// Write then delete a throwaway document.
    async fn probe_write(&self) -> Result<(), AppError>;
}

/// User profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Apply `update` to the stored profile atomically and return the
    /// result. `NotFound` if the profile does not exist.
    async fn update_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AppError>;

    /// Insert `profile` unless one already exists; returns the stored one.
    async fn create_profile_if_absent(&self, profile: &UserProfile)
        -> Result<UserProfile, AppError>;

    /// Toggle `beat_id` in the favorites set; returns whether it is now a
    /// favorite. `NotFound` if the profile does not exist.
    async fn toggle_favorite(
        &self,
        uid: &str,
        beat_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

/// Slots that must be newly claimed and released when `before` becomes
/// `after`.
pub(crate) fn claim_delta(before: &Booking, after: &Booking) -> (Vec<SlotTime>, Vec<SlotTime>) {
    let held: Vec<SlotTime> = if before.status.is_active() {
        slot_span(before.start_time, before.end_time)
    } else {
        Vec::new()
    };
    let wanted: Vec<SlotTime> = if after.status.is_active() {
        slot_span(after.start_time, after.end_time)
    } else {
        Vec::new()
    };

    let claim = wanted.iter().filter(|s| !held.contains(s)).copied().collect();
    let release = held.iter().filter(|s| !wanted.contains(s)).copied().collect();
    (claim, release)
}

/// First of `slots` already held by an active booking other than `own_id`.
pub(crate) fn first_conflict(
    slots: &[SlotTime],
    existing: &[Booking],
    own_id: &str,
) -> Option<SlotTime> {
    slots.iter().copied().find(|slot| {
        existing.iter().any(|b| {
            b.id != own_id && b.status.is_active() && b.occupied_slots().contains(slot)
        })
    })
}
