// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Studio opening hours and free-slot computation.
//!
//! The weekly template is static; everything here is a pure function of the
//! date, the template and the bookings passed in.

use crate::models::booking::SlotTime;
use crate::models::Booking;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Ordered bookable start times for each weekday (Monday first).
#[derive(Debug, Clone)]
pub struct WeeklyTemplate {
    days: [Vec<SlotTime>; 7],
}

fn hourly(from: u8, to: u8) -> Vec<SlotTime> {
    (from..=to).filter_map(|hour| SlotTime::new(hour, 0)).collect()
}

impl Default for WeeklyTemplate {
    /// Weekdays 10:00 to 20:00, Saturday 12:00 to 18:00, closed on Sunday.
    fn default() -> Self {
        let weekday = hourly(10, 20);
        Self {
            days: [
                weekday.clone(),
                weekday.clone(),
                weekday.clone(),
                weekday.clone(),
                weekday,
                hourly(12, 18),
                Vec::new(),
            ],
        }
    }
}

impl WeeklyTemplate {
    /// Build a template from Monday-first day lists. Each list is sorted.
    pub fn new(mut days: [Vec<SlotTime>; 7]) -> Self {
        for day in &mut days {
            day.sort();
            day.dedup();
        }
        Self { days }
    }

    /// Candidate start times for `weekday`; empty means closed.
    pub fn available_hours(&self, weekday: Weekday) -> &[SlotTime] {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn hours_on(&self, date: NaiveDate) -> &[SlotTime] {
        self.available_hours(date.weekday())
    }

    /// Open that day, and not in the past.
    pub fn is_bookable_date(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= today && !self.hours_on(date).is_empty()
    }

    /// Template slots on `date` not held by an active booking, in order.
    pub fn free_slots(&self, date: NaiveDate, bookings: &[Booking]) -> Vec<SlotTime> {
        let taken: Vec<SlotTime> = bookings
            .iter()
            .filter(|b| b.date == date && b.status.is_active())
            .flat_map(Booking::occupied_slots)
            .collect();

        self.hours_on(date)
            .iter()
            .filter(|slot| !taken.contains(slot))
            .copied()
            .collect()
    }

    /// Whether every slot from `start` to `end` is in the template for `date`.
    pub fn covers(&self, date: NaiveDate, slots: &[SlotTime]) -> bool {
        let hours = self.hours_on(date);
        !slots.is_empty() && slots.iter().all(|slot| hours.contains(slot))
    }
}

/// One slot in the day view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub time: SlotTime,
    pub available: bool,
}

/// Availability of `date` for the calendar view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub bookable: bool,
    pub slots: Vec<SlotAvailability>,
}

impl DayAvailability {
    pub fn compute(
        template: &WeeklyTemplate,
        date: NaiveDate,
        today: NaiveDate,
        bookings: &[Booking],
    ) -> Self {
        let bookable = template.is_bookable_date(date, today);
        let free = template.free_slots(date, bookings);
        let slots = template
            .hours_on(date)
            .iter()
            .map(|time| SlotAvailability {
                time: *time,
                available: bookable && free.contains(time),
            })
            .collect();

        Self {
            date,
            bookable,
            slots,
        }
    }
}
