// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking repository: the rules around creating and changing bookings.
//!
//! Slot conflicts are settled by the store inside a transaction; this layer
//! checks identity, validates times against the weekly template and maps
//! backend faults onto the operation's error code.

use crate::db::{BookingStore, ProfileStore};
use crate::error::AppError;
use crate::models::booking::slot_span;
use crate::models::{Booking, BookingChange, BookingUpdate, Caller, NewBooking};
use crate::services::availability::{DayAvailability, WeeklyTemplate};
use crate::services::notifier::BookingNotifier;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use validator::Validate;

pub struct BookingRepository {
    store: Arc<dyn BookingStore>,
    profiles: Arc<dyn ProfileStore>,
    notifier: Arc<dyn BookingNotifier>,
    template: WeeklyTemplate,
}

impl BookingRepository {
    pub fn new(
        store: Arc<dyn BookingStore>,
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        Self {
            store,
            profiles,
            notifier,
            template: WeeklyTemplate::default(),
        }
    }

    /// Every booking on `date`, cancelled ones included.
    pub async fn get_bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        self.store
            .bookings_on(date)
            .await
            .map_err(|e| e.during(AppError::Fetch))
    }

    /// Day view for the calendar.
    pub async fn availability(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<DayAvailability, AppError> {
        let bookings = self.get_bookings_for_date(date).await?;
        Ok(DayAvailability::compute(&self.template, date, today, &bookings))
    }

    /// Validate and store a new pending booking owned by the caller.
    ///
    /// The confirmation email is sent afterwards; its failure is only logged.
    pub async fn create_booking(
        &self,
        caller: Option<&Caller>,
        request: NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let caller = caller.ok_or(AppError::AuthRequired)?;
        request.validate()?;

        let end_time = request.end_time.unwrap_or(request.start_time);
        if end_time < request.start_time {
            return Err(AppError::InvalidSlot(format!(
                "end time {} precedes start time {}",
                end_time, request.start_time
            )));
        }
        if !self.template.is_bookable_date(request.date, now.date_naive()) {
            return Err(AppError::InvalidSlot(format!(
                "{} is not open for booking",
                request.date
            )));
        }
        if !self
            .template
            .covers(request.date, &slot_span(request.start_time, end_time))
        {
            return Err(AppError::InvalidSlot(format!(
                "{} to {} is outside opening hours on {}",
                request.start_time, end_time, request.date
            )));
        }

        let booking = Booking::new_pending(uuid::Uuid::new_v4().to_string(), &request, caller, now);
        self.store
            .create_booking(&booking)
            .await
            .map_err(|e| e.during(AppError::Create))?;

        tracing::info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            date = %booking.date,
            start = %booking.start_time,
            end = %booking.end_time,
            "Booking created"
        );

        if let Err(e) = self.dispatch_confirmation(&booking).await {
            tracing::warn!(
                booking_id = %booking.id,
                error = %e,
                "Booking confirmation could not be sent"
            );
        }

        Ok(booking)
    }

    /// Owner or administrator only. Cancelling twice is harmless.
    pub async fn cancel_booking(
        &self,
        caller: Option<&Caller>,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let caller = caller.ok_or(AppError::AuthRequired)?;
        let booking = self
            .store
            .modify_booking(id, caller, &BookingChange::Cancel, now)
            .await
            .map_err(|e| e.during(AppError::Cancel))?;

        tracing::info!(booking_id = id, by = %caller.uid, "Booking cancelled");
        Ok(booking)
    }

    /// Owner or administrator only; cancelled bookings are frozen.
    pub async fn update_booking(
        &self,
        caller: Option<&Caller>,
        id: &str,
        update: BookingUpdate,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let caller = caller.ok_or(AppError::AuthRequired)?;
        update.validate()?;

        if let Some(end_time) = update.end_time {
            // Date and start time are immutable, so this read cannot go stale.
            let current = self
                .store
                .get_booking(id)
                .await
                .map_err(|e| e.during(AppError::Update))?
                .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
            // Ownership is checked before the slot so errors never describe it.
            if !caller.acts_for(&current.user_id) {
                return Err(AppError::PermissionDenied(format!(
                    "booking {id} belongs to another user"
                )));
            }
            if end_time >= current.start_time
                && !self
                    .template
                    .covers(current.date, &slot_span(current.start_time, end_time))
            {
                return Err(AppError::InvalidSlot(format!(
                    "{} to {} is outside opening hours on {}",
                    current.start_time, end_time, current.date
                )));
            }
        }

        let booking = self
            .store
            .modify_booking(id, caller, &BookingChange::Edit(update), now)
            .await
            .map_err(|e| e.during(AppError::Update))?;

        tracing::info!(booking_id = id, by = %caller.uid, "Booking updated");
        Ok(booking)
    }

    pub async fn get_booking_by_id(&self, caller: &Caller, id: &str) -> Result<Booking, AppError> {
        let booking = self
            .store
            .get_booking(id)
            .await
            .map_err(|e| e.during(AppError::Fetch))?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if !caller.acts_for(&booking.user_id) {
            return Err(AppError::PermissionDenied(format!(
                "booking {id} belongs to another user"
            )));
        }
        Ok(booking)
    }

    pub async fn get_bookings_for_user(
        &self,
        caller: &Caller,
        user_id: &str,
    ) -> Result<Vec<Booking>, AppError> {
        if !caller.acts_for(user_id) {
            return Err(AppError::PermissionDenied(
                "cannot list another user's bookings".to_string(),
            ));
        }
        self.store
            .bookings_for_user(user_id)
            .await
            .map_err(|e| e.during(AppError::Fetch))
    }

    /// Re-send the confirmation for an existing booking.
    pub async fn send_confirmation(&self, caller: &Caller, id: &str) -> Result<(), AppError> {
        let booking = self.get_booking_by_id(caller, id).await?;
        self.dispatch_confirmation(&booking).await
    }

    async fn dispatch_confirmation(&self, booking: &Booking) -> Result<(), AppError> {
        let profile_email = self
            .profiles
            .get_profile(&booking.user_id)
            .await?
            .map(|p| p.email)
            .filter(|email| !email.is_empty());
        let recipient = profile_email.or_else(|| {
            Some(booking.user_name.clone()).filter(|name| name.contains('@'))
        });

        let Some(recipient) = recipient else {
            return Err(AppError::BadRequest(format!(
                "no email address known for user {}",
                booking.user_id
            )));
        };
        self.notifier.booking_confirmed(booking, &recipient).await
    }
}
