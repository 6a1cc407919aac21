// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod firebase_auth;
pub mod migration;
pub mod notifier;
pub mod profiles;
pub mod slot_selector;

pub use availability::{DayAvailability, WeeklyTemplate};
pub use bookings::BookingRepository;
pub use catalog::BeatCatalog;
pub use firebase_auth::{FirebaseTokenVerifier, TokenError, VerifiedIdentity};
pub use migration::CatalogMigrator;
pub use notifier::{BookingNotifier, MailNotifier, NoopNotifier};
pub use profiles::ProfileService;
pub use slot_selector::SlotSelection;
