// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Studio booking model for storage and API.

use crate::error::AppError;
use crate::models::user::Caller;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Wall-clock start time of an hourly slot, always rendered as `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime {
    hour: u8,
    minute: u8,
}

impl SlotTime {
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Same minute, `delta` hours later (or earlier). `None` past midnight.
    pub fn shifted_hours(&self, delta: i8) -> Option<Self> {
        let hour = i16::from(self.hour) + i16::from(delta);
        u8::try_from(hour)
            .ok()
            .and_then(|hour| Self::new(hour, self.minute))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for SlotTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected HH:mm, got {s:?}");
        let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hour = hours.parse::<u8>().map_err(|_| invalid())?;
        let minute = minutes.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every hourly slot from `start` through `end`, inclusive.
pub fn slot_span(start: SlotTime, end: SlotTime) -> Vec<SlotTime> {
    let mut slots = vec![start];
    let mut current = start;
    while current < end {
        match current.shifted_hours(1) {
            Some(next) if next <= end => {
                slots.push(next);
                current = next;
            }
            _ => break,
        }
    }
    slots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status {other:?}")),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        })
    }
}

/// Kind of studio session. `photo` is written by the booking form's
/// photography category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SessionType {
    Recording,
    Mixing,
    Mastering,
    Photo,
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recording" => Ok(SessionType::Recording),
            "mixing" => Ok(SessionType::Mixing),
            "mastering" => Ok(SessionType::Mastering),
            "photo" => Ok(SessionType::Photo),
            other => Err(format!("unknown session type {other:?}")),
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionType::Recording => "recording",
            SessionType::Mixing => "mixing",
            SessionType::Mastering => "mastering",
            SessionType::Photo => "photo",
        })
    }
}

/// A validated booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Booking {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: SlotTime,
    /// Equal to `start_time` for a single-slot booking.
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_time: SlotTime,
    pub user_id: String,
    pub user_name: String,
    pub status: BookingStatus,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub notes: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Build a new pending booking owned by `caller`.
    pub fn new_pending(id: String, request: &NewBooking, caller: &Caller, now: DateTime<Utc>) -> Self {
        Self {
            id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time.unwrap_or(request.start_time),
            user_id: caller.uid.clone(),
            user_name: caller.email.clone().unwrap_or_default(),
            status: BookingStatus::Pending,
            session_type: request.session_type,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: None,
        }
    }

    /// Hourly slots held by this booking.
    pub fn occupied_slots(&self) -> Vec<SlotTime> {
        slot_span(self.start_time, self.end_time)
    }

    /// Apply an owner/admin mutation, enforcing the booking rules.
    ///
    /// Cancelling an already-cancelled booking returns it unchanged.
    pub fn apply(
        &self,
        caller: &Caller,
        change: &BookingChange,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        if self.user_id != caller.uid && !caller.is_admin {
            return Err(AppError::PermissionDenied(format!(
                "booking {} belongs to another user",
                self.id
            )));
        }

        let mut next = self.clone();
        match change {
            BookingChange::Cancel => {
                if self.status == BookingStatus::Cancelled {
                    return Ok(next);
                }
                next.status = BookingStatus::Cancelled;
            }
            BookingChange::Edit(update) => {
                if self.status == BookingStatus::Cancelled {
                    return Err(AppError::InvalidStatus(format!(
                        "booking {} is cancelled",
                        self.id
                    )));
                }
                if let Some(notes) = &update.notes {
                    next.notes = Some(notes.clone());
                }
                if let Some(session_type) = update.session_type {
                    next.session_type = session_type;
                }
                if let Some(end_time) = update.end_time {
                    if end_time < next.start_time {
                        return Err(AppError::InvalidSlot(format!(
                            "end time {end_time} precedes start time {}",
                            next.start_time
                        )));
                    }
                    next.end_time = end_time;
                }
            }
        }
        next.updated_at = Some(now);
        Ok(next)
    }
}

/// Client request to create a booking. Identity comes from the verified
/// caller, never from the body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewBooking {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_time: SlotTime,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end_time: Option<SlotTime>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Fields an owner may change on an active booking.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BookingUpdate {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end_time: Option<SlotTime>,
}

/// A mutation applied atomically by the booking store.
#[derive(Debug, Clone)]
pub enum BookingChange {
    Edit(BookingUpdate),
    Cancel,
}

/// Booking as stored in the `bookings` collection (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDocument {
    pub id: String,
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub session_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// RFC3339, set by the server
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<&Booking> for BookingDocument {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.clone(),
            date: booking.date.format("%Y-%m-%d").to_string(),
            start_time: booking.start_time.to_string(),
            end_time: Some(booking.end_time.to_string()),
            user_id: booking.user_id.clone(),
            user_name: booking.user_name.clone(),
            status: booking.status.to_string(),
            session_type: booking.session_type.to_string(),
            notes: booking.notes.clone(),
            created_at: format_utc_rfc3339(booking.created_at),
            updated_at: booking.updated_at.map(format_utc_rfc3339),
        }
    }
}

impl TryFrom<BookingDocument> for Booking {
    type Error = String;

    fn try_from(doc: BookingDocument) -> Result<Self, Self::Error> {
        if doc.id.is_empty() {
            return Err("missing id".to_string());
        }
        if doc.user_id.is_empty() {
            return Err(format!("booking {} has no owner", doc.id));
        }

        let date = NaiveDate::parse_from_str(&doc.date, "%Y-%m-%d")
            .map_err(|e| format!("booking {}: bad date {:?}: {e}", doc.id, doc.date))?;
        let start_time: SlotTime = doc.start_time.parse()?;
        let end_time = match doc.end_time.as_deref() {
            None | Some("") => start_time,
            Some(raw) => raw.parse()?,
        };
        if end_time < start_time {
            return Err(format!("booking {}: end time precedes start time", doc.id));
        }

        Ok(Booking {
            date,
            start_time,
            end_time,
            status: doc.status.parse()?,
            session_type: doc.session_type.parse()?,
            created_at: parse_timestamp(&doc.created_at)?,
            updated_at: doc.updated_at.as_deref().map(parse_timestamp).transpose()?,
            id: doc.id,
            user_id: doc.user_id,
            user_name: doc.user_name,
            notes: doc.notes,
        })
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {raw:?}: {e}"))
}

/// Slot claim document in `booking_slots`, keyed by [`slot_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotClaim {
    pub booking_id: String,
    pub date: String,
    pub start_time: String,
}

/// Document ID of the claim for one slot, e.g. `2030-06-03_10:00`.
pub fn slot_key(date: NaiveDate, time: SlotTime) -> String {
    format!("{}_{}", date.format("%Y-%m-%d"), time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(raw: &str) -> SlotTime {
        raw.parse().unwrap()
    }

    fn caller(uid: &str) -> Caller {
        Caller {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
            is_admin: false,
        }
    }

    fn booking(owner: &str, status: BookingStatus) -> Booking {
        Booking {
            id: "b1".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 6, 3).unwrap(),
            start_time: t("10:00"),
            end_time: t("10:00"),
            user_id: owner.to_string(),
            user_name: format!("{owner}@example.com"),
            status,
            session_type: SessionType::Recording,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn slot_time_parses_and_formats() {
        assert_eq!(t("09:30").to_string(), "09:30");
        assert!("9:30".parse::<SlotTime>().is_err());
        assert!("24:00".parse::<SlotTime>().is_err());
        assert!("10:60".parse::<SlotTime>().is_err());
        assert!("ten".parse::<SlotTime>().is_err());
    }

    #[test]
    fn slot_time_shifts_within_day() {
        assert_eq!(t("10:00").shifted_hours(1), Some(t("11:00")));
        assert_eq!(t("10:00").shifted_hours(-1), Some(t("09:00")));
        assert_eq!(t("23:00").shifted_hours(1), None);
        assert_eq!(t("00:00").shifted_hours(-1), None);
    }

    #[test]
    fn span_includes_both_ends() {
        assert_eq!(slot_span(t("10:00"), t("10:00")), vec![t("10:00")]);
        assert_eq!(
            slot_span(t("10:00"), t("12:00")),
            vec![t("10:00"), t("11:00"), t("12:00")]
        );
    }

    #[test]
    fn document_round_trip_preserves_booking() {
        let original = booking("alice", BookingStatus::Pending);
        let parsed = Booking::try_from(BookingDocument::from(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn document_without_end_time_defaults_to_start() {
        let mut doc = BookingDocument::from(&booking("alice", BookingStatus::Pending));
        doc.end_time = None;
        let parsed = Booking::try_from(doc).unwrap();
        assert_eq!(parsed.end_time, parsed.start_time);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let good = BookingDocument::from(&booking("alice", BookingStatus::Pending));

        let mut bad = good.clone();
        bad.start_time = "10h".to_string();
        assert!(Booking::try_from(bad).is_err());

        let mut bad = good.clone();
        bad.status = "archived".to_string();
        assert!(Booking::try_from(bad).is_err());

        let mut bad = good;
        bad.user_id = String::new();
        assert!(Booking::try_from(bad).is_err());
    }

    #[test]
    fn non_owner_cannot_change_booking() {
        let now = Utc::now();
        let current = booking("alice", BookingStatus::Pending);

        let err = current
            .apply(&caller("mallory"), &BookingChange::Cancel, now)
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[test]
    fn admin_may_cancel_any_booking() {
        let mut admin = caller("staff");
        admin.is_admin = true;
        let current = booking("alice", BookingStatus::Confirmed);

        let next = current.apply(&admin, &BookingChange::Cancel, Utc::now()).unwrap();
        assert_eq!(next.status, BookingStatus::Cancelled);
    }

    #[test]
    fn editing_cancelled_booking_is_invalid() {
        let current = booking("alice", BookingStatus::Cancelled);
        let change = BookingChange::Edit(BookingUpdate {
            notes: Some("bring guitar".to_string()),
            ..Default::default()
        });

        let err = current.apply(&caller("alice"), &change, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS");
    }

    #[test]
    fn cancelling_twice_is_a_no_op() {
        let current = booking("alice", BookingStatus::Cancelled);
        let next = current
            .apply(&caller("alice"), &BookingChange::Cancel, Utc::now())
            .unwrap();
        assert_eq!(next, current);
    }

    #[test]
    fn edit_merges_fields_and_stamps_update_time() {
        let now = Utc.with_ymd_and_hms(2030, 2, 1, 12, 0, 0).unwrap();
        let current = booking("alice", BookingStatus::Pending);
        let change = BookingChange::Edit(BookingUpdate {
            notes: Some("vocals only".to_string()),
            session_type: Some(SessionType::Mixing),
            end_time: Some(t("11:00")),
        });

        let next = current.apply(&caller("alice"), &change, now).unwrap();
        assert_eq!(next.notes.as_deref(), Some("vocals only"));
        assert_eq!(next.session_type, SessionType::Mixing);
        assert_eq!(next.occupied_slots(), vec![t("10:00"), t("11:00")]);
        assert_eq!(next.updated_at, Some(now));
        assert_eq!(next.created_at, current.created_at);
    }
}
