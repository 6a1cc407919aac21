// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beat catalog model for storage and API.

use crate::models::booking::parse_timestamp;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Closed set of genres a beat can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MusicStyle {
    Trap,
    Drill,
    #[serde(alias = "R&B")]
    RnB,
    Rap,
    Afro,
    Pop,
    Dancehall,
    Cloud,
    #[serde(rename = "Boom Bap")]
    BoomBap,
}

impl MusicStyle {
    pub const ALL: [MusicStyle; 9] = [
        MusicStyle::Trap,
        MusicStyle::Drill,
        MusicStyle::RnB,
        MusicStyle::Rap,
        MusicStyle::Afro,
        MusicStyle::Pop,
        MusicStyle::Dancehall,
        MusicStyle::Cloud,
        MusicStyle::BoomBap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MusicStyle::Trap => "Trap",
            MusicStyle::Drill => "Drill",
            MusicStyle::RnB => "RnB",
            MusicStyle::Rap => "Rap",
            MusicStyle::Afro => "Afro",
            MusicStyle::Pop => "Pop",
            MusicStyle::Dancehall => "Dancehall",
            MusicStyle::Cloud => "Cloud",
            MusicStyle::BoomBap => "Boom Bap",
        }
    }
}

impl fmt::Display for MusicStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MusicStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "R&B" {
            return Ok(MusicStyle::RnB);
        }
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| format!("unknown style {s:?}"))
    }
}

/// Beat as stored in the `beats` collection (document ID = `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub price: f64,
    /// Seconds
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub bpm: Option<u32>,
    #[serde(default)]
    pub audio_path: String,
    #[serde(default)]
    pub image_path: Option<String>,
    /// Lower-cased search tags
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub plays: u64,
    #[serde(default)]
    pub likes: u64,
    /// RFC3339
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl BeatDocument {
    /// Fresh catalog record with zeroed counters.
    pub fn from_new(id: String, beat: &NewBeat, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: beat.title.trim().to_string(),
            producer: beat.producer.trim().to_string(),
            style: beat.style.to_string(),
            price: beat.price,
            duration: beat.duration,
            bpm: beat.bpm,
            audio_path: beat.audio_path.clone(),
            image_path: beat.image_path.clone().filter(|p| !p.is_empty()),
            tags: normalize_tags(&beat.tags),
            plays: 0,
            likes: 0,
            created_at: format_utc_rfc3339(now),
            updated_at: None,
        }
    }

    /// Merge an admin edit. Counters and identity are never touched here.
    pub fn apply(&mut self, update: &BeatUpdate, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.trim().to_string();
        }
        if let Some(producer) = &update.producer {
            self.producer = producer.trim().to_string();
        }
        if let Some(style) = update.style {
            self.style = style.to_string();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(bpm) = update.bpm {
            self.bpm = Some(bpm);
        }
        if let Some(audio_path) = &update.audio_path {
            self.audio_path = audio_path.clone();
        }
        if let Some(image_path) = &update.image_path {
            self.image_path = Some(image_path.clone()).filter(|p| !p.is_empty());
        }
        if let Some(tags) = &update.tags {
            self.tags = normalize_tags(tags);
        }
        self.updated_at = Some(format_utc_rfc3339(now));
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// A validated catalog record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Beat {
    pub id: String,
    pub title: String,
    pub producer: String,
    pub style: MusicStyle,
    pub price: f64,
    pub duration: u32,
    pub bpm: Option<u32>,
    pub audio_path: String,
    pub image_path: Option<String>,
    pub tags: Vec<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub plays: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub likes: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BeatDocument> for Beat {
    type Error = String;

    fn try_from(doc: BeatDocument) -> Result<Self, Self::Error> {
        if doc.id.is_empty() {
            return Err("missing id".to_string());
        }
        if doc.audio_path.is_empty() {
            return Err(format!("beat {} has no audioPath", doc.id));
        }
        if doc.title.is_empty() {
            return Err(format!("beat {} has no title", doc.id));
        }
        let style = doc
            .style
            .parse()
            .map_err(|e| format!("beat {}: {e}", doc.id))?;
        let created_at =
            parse_timestamp(&doc.created_at).map_err(|e| format!("beat {}: {e}", doc.id))?;

        Ok(Beat {
            id: doc.id,
            title: doc.title,
            producer: doc.producer,
            style,
            price: doc.price,
            duration: doc.duration,
            bpm: doc.bpm,
            audio_path: doc.audio_path,
            image_path: doc.image_path.filter(|p| !p.is_empty()),
            tags: doc.tags,
            plays: doc.plays,
            likes: doc.likes,
            created_at,
        })
    }
}

/// A beat with its assets resolved to time-limited download URLs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BeatView {
    #[serde(flatten)]
    pub beat: Beat,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
}

/// Admin request to add a beat whose assets are already uploaded.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewBeat {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub producer: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub style: MusicStyle,
    pub duration: u32,
    #[serde(default)]
    #[validate(range(min = 20, max = 400))]
    pub bpm: Option<u32>,
    #[validate(length(min = 1))]
    pub audio_path: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial admin edit of a catalog record.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BeatUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub producer: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub style: Option<MusicStyle>,
    pub duration: Option<u32>,
    #[validate(range(min = 20, max = 400))]
    pub bpm: Option<u32>,
    #[validate(length(min = 1))]
    pub audio_path: Option<String>,
    pub image_path: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Like marker stored at `beats/{beatId}/likes/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeMarker {
    pub user_id: String,
    /// RFC3339
    pub created_at: String,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LikeToggle {
    pub liked: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub likes: u64,
}

/// An item that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ItemFailure {
    pub item: String,
    pub reason: String,
}

/// Catalog listing; records that could not be served are reported, not hidden.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BeatListing {
    pub beats: Vec<BeatView>,
    pub unavailable: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MigratedBeat {
    /// Object path in the bucket
    pub item: String,
    pub beat_id: String,
    pub title: String,
    pub action: UpsertAction,
    pub image_path: Option<String>,
}

/// Structured result of the storage-to-catalog reconciliation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MigrationReport {
    pub succeeded: Vec<MigratedBeat>,
    pub failed: Vec<ItemFailure>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CatalogRecordSummary {
    pub id: String,
    pub title: String,
    pub producer: String,
    pub audio_path: String,
}

/// Side-effect-free comparison of the bucket against the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MigrationCheck {
    pub storage_objects: usize,
    pub catalog_records: usize,
    pub records: Vec<CatalogRecordSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> BeatDocument {
        BeatDocument {
            id: "beat-1".to_string(),
            title: "Ocean Vibes".to_string(),
            producer: "43 Art".to_string(),
            style: "R&B".to_string(),
            price: 349.0,
            duration: 210,
            bpm: None,
            audio_path: "beats/ocean-vibes.mp3".to_string(),
            image_path: Some(String::new()),
            tags: vec![],
            plays: 3,
            likes: 1,
            created_at: "2030-01-01T00:00:00Z".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn styles_use_display_names() {
        assert_eq!("Boom Bap".parse::<MusicStyle>(), Ok(MusicStyle::BoomBap));
        assert_eq!("R&B".parse::<MusicStyle>(), Ok(MusicStyle::RnB));
        assert!("Polka".parse::<MusicStyle>().is_err());
        assert_eq!(
            serde_json::to_string(&MusicStyle::BoomBap).unwrap(),
            "\"Boom Bap\""
        );
    }

    #[test]
    fn parses_legacy_document() {
        let beat = Beat::try_from(document()).unwrap();
        assert_eq!(beat.style, MusicStyle::RnB);
        // Empty image path means no cover
        assert_eq!(beat.image_path, None);
    }

    #[test]
    fn rejects_document_without_audio() {
        let mut doc = document();
        doc.audio_path = String::new();
        assert!(Beat::try_from(doc).is_err());
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let raw = serde_json::json!({
            "id": "b",
            "title": "Street Life",
            "style": "Drill",
            "audioPath": "beats/street-life.mp3",
            "createdAt": "2030-01-01T00:00:00Z"
        });
        let doc: BeatDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.plays, 0);
        assert_eq!(doc.likes, 0);
        assert!(Beat::try_from(doc).is_ok());
    }

    #[test]
    fn update_keeps_counters() {
        let mut doc = document();
        doc.apply(
            &BeatUpdate {
                title: Some(" Ocean Vibes II ".to_string()),
                tags: Some(vec!["Chill".to_string(), "chill".to_string()]),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(doc.title, "Ocean Vibes II");
        assert_eq!(doc.tags, vec!["chill".to_string()]);
        assert_eq!(doc.plays, 3);
        assert_eq!(doc.likes, 1);
        assert!(doc.updated_at.is_some());
    }

    #[test]
    fn new_beat_validation() {
        let beat = NewBeat {
            title: String::new(),
            producer: "43 Art".to_string(),
            price: -1.0,
            style: MusicStyle::Trap,
            duration: 180,
            bpm: None,
            audio_path: "beats/x.mp3".to_string(),
            image_path: None,
            tags: vec![],
        };
        let errors = beat.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("price"));
    }
}
