// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod beat;
pub mod booking;
pub mod user;

pub use beat::{
    Beat, BeatDocument, BeatListing, BeatUpdate, BeatView, ItemFailure, LikeToggle,
    MigrationCheck, MigrationReport, MusicStyle, NewBeat,
};
pub use booking::{
    Booking, BookingChange, BookingDocument, BookingStatus, BookingUpdate, NewBooking,
    SessionType, SlotTime,
};
pub use user::{Caller, ProfileUpdate, SocialLinks, UserProfile, UserStats};
