// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Studio booking routes.

use crate::error::{AppError, Result};
use crate::middleware::{MaybeCaller, RequireCaller};
use crate::models::{Booking, BookingUpdate, NewBooking};
use crate::routes::extract::{BookingJson, ValidatedJson};
use crate::services::DayAvailability;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/availability", get(get_availability))
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/{id}", get(get_booking).patch(update_booking))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/sendBookingConfirmation", post(send_confirmation))
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("date is required".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidSlot(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

/// Free and taken slots for one day. Public.
async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateQuery>,
) -> Result<Json<DayAvailability>> {
    let date = parse_date(params.date.as_deref())?;
    let today = Utc::now().date_naive();
    Ok(Json(state.bookings.availability(date, today).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    date: Option<String>,
    user_id: Option<String>,
}

/// Bookings on a date, or a user's bookings with `?userId=`.
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>> {
    if let Some(user_id) = params.user_id.as_deref() {
        return Ok(Json(
            state.bookings.get_bookings_for_user(&caller, user_id).await?,
        ));
    }

    let date = parse_date(params.date.as_deref())?;
    Ok(Json(state.bookings.get_bookings_for_date(date).await?))
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    MaybeCaller(caller): MaybeCaller,
    BookingJson(request): BookingJson<NewBooking>,
) -> Result<(StatusCode, Json<Booking>)> {
    let booking = state
        .bookings
        .create_booking(caller.as_ref(), request, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> Result<Json<Booking>> {
    Ok(Json(state.bookings.get_booking_by_id(&caller, &id).await?))
}

async fn update_booking(
    State(state): State<Arc<AppState>>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<String>,
    BookingJson(update): BookingJson<BookingUpdate>,
) -> Result<Json<Booking>> {
    let booking = state
        .bookings
        .update_booking(caller.as_ref(), &id, update, Utc::now())
        .await?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<String>,
) -> Result<Json<Booking>> {
    let booking = state
        .bookings
        .cancel_booking(caller.as_ref(), &id, Utc::now())
        .await?;
    Ok(Json(booking))
}

/// Body of `POST /api/sendBookingConfirmation`. Other fields sent by older
/// clients are ignored; the booking is reloaded from the store.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConfirmationRequest {
    #[validate(length(min = 1))]
    pub booking_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConfirmationResponse {
    pub success: bool,
}

async fn send_confirmation(
    State(state): State<Arc<AppState>>,
    RequireCaller(caller): RequireCaller,
    ValidatedJson(request): ValidatedJson<ConfirmationRequest>,
) -> Result<Json<ConfirmationResponse>> {
    state
        .bookings
        .send_confirmation(&caller, &request.booking_id)
        .await?;
    Ok(Json(ConfirmationResponse { success: true }))
}
