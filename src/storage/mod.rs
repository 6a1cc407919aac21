// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Binary object store (beat audio, covers, profile photos).

pub mod gcs;
pub mod memory;

pub use gcs::GcsObjectStore;
pub use memory::MemoryObjectStore;

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Folder holding beat audio; covers live in subfolders.
pub const BEATS_PREFIX: &str = "beats/";

/// Metadata of a stored object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredObject {
    /// Full path within the bucket, e.g. `beats/track-one.mp3`
    pub path: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    /// User-supplied metadata (title, producer, style, price, duration)
    pub custom_metadata: HashMap<String, String>,
}

impl StoredObject {
    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Object storage operations used by the catalog and profile services.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    /// Time-limited download URL for an existing object.
    async fn download_url(&self, path: &str) -> Result<String, AppError>;

    /// Objects directly under `prefix` (not in deeper folders).
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, AppError>;

    /// `None` if the object does not exist.
    async fn metadata(&self, path: &str) -> Result<Option<StoredObject>, AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;
}

/// Whether `path` sits directly under `prefix`.
pub(crate) fn is_direct_child(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}
