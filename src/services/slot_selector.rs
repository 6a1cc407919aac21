// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Two-click time range selection.
//!
//! A first click picks a start time; a click on the hour just before or after
//! it commits a two-slot range. Anything else restarts the selection.

use crate::models::booking::SlotTime;
use serde::Serialize;

/// Current selection in the day view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SlotSelection {
    #[default]
    Empty,
    Single { start: SlotTime },
    Range { start: SlotTime, end: SlotTime },
}

impl SlotSelection {
    pub fn start(&self) -> Option<SlotTime> {
        match self {
            SlotSelection::Empty => None,
            SlotSelection::Single { start } | SlotSelection::Range { start, .. } => Some(*start),
        }
    }

    pub fn end(&self) -> Option<SlotTime> {
        match self {
            SlotSelection::Range { end, .. } => Some(*end),
            _ => None,
        }
    }

    /// Apply a click on `time`. `booked` holds the start times shown as taken.
    ///
    /// Adjacency is plain hour arithmetic; it does not check that the
    /// neighbouring hour is itself offered that day.
    pub fn click(self, time: SlotTime, booked: &[SlotTime]) -> SlotSelection {
        if booked.contains(&time) {
            return self;
        }

        let Some(start) = self.start() else {
            return SlotSelection::Single { start: time };
        };
        if time == start {
            return SlotSelection::Empty;
        }
        if let SlotSelection::Range { .. } = self {
            return SlotSelection::Single { start: time };
        }

        let adjacent =
            start.shifted_hours(1) == Some(time) || start.shifted_hours(-1) == Some(time);
        if adjacent {
            SlotSelection::Range {
                start: start.min(time),
                end: start.max(time),
            }
        } else {
            SlotSelection::Single { start: time }
        }
    }
}
