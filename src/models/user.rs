//! User profile model for storage and API.

use crate::models::booking::parse_timestamp;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Verified identity of the caller, derived from the Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Firebase uid (also the `users` document ID)
    pub uid: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Caller {
    /// Whether the caller may see or change data owned by `owner_id`.
    pub fn acts_for(&self, owner_id: &str) -> bool {
        self.uid == owner_id || self.is_admin
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soundcloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

/// Profile stored in the `users` collection (document ID = uid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: Option<SocialLinks>,
    /// Beat IDs; order carries no meaning
    #[serde(default)]
    pub favorite_beats: BTreeSet<String>,
    /// RFC3339
    pub created_at: String,
    /// RFC3339
    pub updated_at: String,
}

impl UserProfile {
    /// Profile created lazily on the first authenticated request.
    pub fn for_caller(caller: &Caller, now: DateTime<Utc>) -> Self {
        let email = caller.email.clone().unwrap_or_default();
        let display_name = email.split('@').next().unwrap_or_default().to_string();
        let now = format_utc_rfc3339(now);
        Self {
            id: caller.uid.clone(),
            email,
            display_name,
            photo_url: None,
            phone_number: None,
            bio: None,
            social_links: None,
            favorite_beats: BTreeSet::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Check the stored shape beyond what serde enforces.
    pub fn validate_document(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("profile without id".to_string());
        }
        parse_timestamp(&self.created_at)?;
        parse_timestamp(&self.updated_at)?;
        Ok(())
    }

    /// Merge an owner update and stamp `updatedAt`.
    pub fn apply(&mut self, update: &ProfileUpdate, now: DateTime<Utc>) {
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.trim().to_string();
        }
        if let Some(photo_url) = &update.photo_url {
            self.photo_url = Some(photo_url.clone());
        }
        if let Some(phone_number) = &update.phone_number {
            self.phone_number = Some(phone_number.clone());
        }
        if let Some(bio) = &update.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(links) = &update.social_links {
            self.social_links = Some(links.clone());
        }
        self.updated_at = format_utc_rfc3339(now);
    }

    /// Add or remove a favorite. Returns whether the beat is now a favorite.
    pub fn toggle_favorite(&mut self, beat_id: &str, now: DateTime<Utc>) -> bool {
        let favorite = if self.favorite_beats.remove(beat_id) {
            false
        } else {
            self.favorite_beats.insert(beat_id.to_string());
            true
        };
        self.updated_at = format_utc_rfc3339(now);
        favorite
    }
}

/// Owner-editable profile fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(url)]
    pub photo_url: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    pub social_links: Option<SocialLinks>,
}

/// Dashboard counters for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    pub total_bookings: u32,
    pub upcoming_bookings: u32,
    pub favorite_beats: u32,
}
