// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store used by tests and local runs without Firestore.
//!
//! A single mutex guards all collections, so every operation is trivially
//! atomic.

use crate::db::{
    claim_delta, first_conflict, BeatOrder, BookingStore, CatalogStore, ProfileStore,
    UpsertOutcome, PROBE_DOCUMENT_ID,
};
use crate::error::AppError;
use crate::models::booking::SlotTime;
use crate::models::{
    BeatDocument, BeatUpdate, Booking, BookingChange, Caller, LikeToggle, ProfileUpdate,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    bookings: HashMap<String, Booking>,
    claims: HashMap<(NaiveDate, SlotTime), String>,
    beats: BTreeMap<String, BeatDocument>,
    /// (beat ID, user ID)
    likes: HashSet<(String, String)>,
    profiles: HashMap<String, UserProfile>,
    probes: HashSet<String>,
}

/// In-memory implementation of all store traits.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the backend were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Store a raw catalog document, bypassing validation.
    pub fn seed_beat(&self, doc: BeatDocument) {
        if let Ok(mut state) = self.state.lock() {
            state.beats.insert(doc.id.clone(), doc);
        }
    }

    /// Number of stored beat documents (including invalid ones).
    pub fn beat_count(&self) -> usize {
        self.state.lock().map(|s| s.beats.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Database("Database not connected (offline mode)".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| AppError::Database("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl BookingStore for MemoryDb {
    async fn create_booking(&self, booking: &Booking) -> Result<(), AppError> {
        let mut state = self.lock()?;

        let slots = booking.occupied_slots();
        if let Some(slot) = slots
            .iter()
            .find(|slot| state.claims.contains_key(&(booking.date, **slot)))
        {
            return Err(AppError::SlotAlreadyBooked(format!("{} {}", booking.date, slot)));
        }
        let same_day: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.date == booking.date)
            .cloned()
            .collect();
        if let Some(slot) = first_conflict(&slots, &same_day, &booking.id) {
            return Err(AppError::SlotAlreadyBooked(format!("{} {}", booking.date, slot)));
        }

        for slot in slots {
            state.claims.insert((booking.date, slot), booking.id.clone());
        }
        state.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        Ok(self.lock()?.bookings.get(id).cloned())
    }

    async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.date == date)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_time);
        Ok(bookings)
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
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
        let mut state = self.lock()?;

        let current = state
            .bookings
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        let next = current.apply(caller, change, now)?;
        if next == current {
            return Ok(next);
        }

        let (claim, release) = claim_delta(&current, &next);
        if let Some(slot) = claim.iter().find(|slot| {
            state
                .claims
                .get(&(next.date, **slot))
                .is_some_and(|holder| holder != id)
        }) {
            return Err(AppError::SlotAlreadyBooked(format!("{} {}", next.date, slot)));
        }

        for slot in release {
            state.claims.remove(&(current.date, slot));
        }
        for slot in claim {
            state.claims.insert((next.date, slot), id.to_string());
        }
        state.bookings.insert(id.to_string(), next.clone());
        Ok(next)
    }
}

#[async_trait]
impl CatalogStore for MemoryDb {
    async fn list_beats(
        &self,
        order: BeatOrder,
        limit: Option<u32>,
    ) -> Result<Vec<BeatDocument>, AppError> {
        let mut beats: Vec<BeatDocument> = self.lock()?.beats.values().cloned().collect();
        match order {
            BeatOrder::Unordered => {}
            BeatOrder::MostPlayed => beats.sort_by(|a, b| b.plays.cmp(&a.plays)),
            // RFC3339 UTC strings sort chronologically
            BeatOrder::Newest => beats.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        if let Some(limit) = limit {
            beats.truncate(limit as usize);
        }
        Ok(beats)
    }

    async fn beats_with_tag(&self, tag: &str) -> Result<Vec<BeatDocument>, AppError> {
        Ok(self
            .lock()?
            .beats
            .values()
            .filter(|b| b.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn get_beat(&self, id: &str) -> Result<Option<BeatDocument>, AppError> {
        Ok(self.lock()?.beats.get(id).cloned())
    }

    async fn insert_beat(&self, beat: &BeatDocument) -> Result<(), AppError> {
        self.lock()?.beats.insert(beat.id.clone(), beat.clone());
        Ok(())
    }

    async fn update_beat(
        &self,
        id: &str,
        update: &BeatUpdate,
        now: DateTime<Utc>,
    ) -> Result<BeatDocument, AppError> {
        let mut state = self.lock()?;
        let beat = state
            .beats
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("beat {id}")))?;
        beat.apply(update, now);
        Ok(beat.clone())
    }

    async fn delete_beat(&self, id: &str) -> Result<(), AppError> {
        let mut state = self.lock()?;
        state.beats.remove(id);
        state.likes.retain(|(beat_id, _)| beat_id != id);
        Ok(())
    }

    async fn increment_plays(&self, id: &str) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let beat = state
            .beats
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("beat {id}")))?;
        beat.plays += 1;
        Ok(beat.plays)
    }

    async fn toggle_like(
        &self,
        beat_id: &str,
        user_id: &str,
        _now: DateTime<Utc>,
    ) -> Result<LikeToggle, AppError> {
        let mut state = self.lock()?;
        if !state.beats.contains_key(beat_id) {
            return Err(AppError::NotFound(format!("beat {beat_id}")));
        }

        let key = (beat_id.to_string(), user_id.to_string());
        let liked = if state.likes.remove(&key) {
            false
        } else {
            state.likes.insert(key);
            true
        };

        let beat = state
            .beats
            .get_mut(beat_id)
            .ok_or_else(|| AppError::NotFound(format!("beat {beat_id}")))?;
        beat.likes = if liked {
            beat.likes + 1
        } else {
            beat.likes.saturating_sub(1)
        };
        Ok(LikeToggle {
            liked,
            likes: beat.likes,
        })
    }

    async fn has_liked(&self, beat_id: &str, user_id: &str) -> Result<bool, AppError> {
        Ok(self
            .lock()?
            .likes
            .contains(&(beat_id.to_string(), user_id.to_string())))
    }

    async fn upsert_by_title(&self, beat: &BeatDocument) -> Result<UpsertOutcome, AppError> {
        let mut state = self.lock()?;
        let existing = state
            .beats
            .values_mut()
            .find(|b| b.title == beat.title);

        match existing {
            Some(current) => {
                let id = current.id.clone();
                *current = BeatDocument {
                    id: id.clone(),
                    plays: current.plays,
                    likes: current.likes,
                    tags: current.tags.clone(),
                    bpm: current.bpm,
                    ..beat.clone()
                };
                Ok(UpsertOutcome::Updated(id))
            }
            None => {
                state.beats.insert(beat.id.clone(), beat.clone());
                Ok(UpsertOutcome::Created(beat.id.clone()))
            }
        }
    }

    async fn probe_write(&self) -> Result<(), AppError> {
        let mut state = self.lock()?;
        state.probes.insert(PROBE_DOCUMENT_ID.to_string());
        state.probes.remove(PROBE_DOCUMENT_ID);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryDb {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.lock()?.profiles.get(uid).cloned())
    }

    async fn update_profile(
        &self,
        uid: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AppError> {
        let mut state = self.lock()?;
        let profile = state
            .profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("profile {uid}")))?;
        profile.apply(update, now);
        Ok(profile.clone())
    }

    async fn create_profile_if_absent(
        &self,
        profile: &UserProfile,
    ) -> Result<UserProfile, AppError> {
        Ok(self
            .lock()?
            .profiles
            .entry(profile.id.clone())
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn toggle_favorite(
        &self,
        uid: &str,
        beat_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let profile = state
            .profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("profile {uid}")))?;
        Ok(profile.toggle_favorite(beat_id, now))
    }
}
