//! In-memory object store for tests.

use crate::error::AppError;
use crate::storage::{is_direct_child, ObjectStore, StoredObject};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;

/// Bucket emulation backed by a concurrent map.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, (StoredObject, Vec<u8>)>,
    /// Paths whose URL resolution fails
    broken_urls: DashSet<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object with custom metadata.
    pub fn put(&self, path: &str, content_type: &str, metadata: &[(&str, &str)]) {
        let object = StoredObject {
            path: path.to_string(),
            content_type: Some(content_type.to_string()),
            size: 0,
            created_at: Some(Utc::now()),
            custom_metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        };
        self.objects.insert(path.to_string(), (object, Vec::new()));
    }

    /// Make URL resolution fail for these paths.
    pub fn set_broken_urls(&self, paths: &[&str]) {
        self.broken_urls.clear();
        for path in paths {
            self.broken_urls.insert(path.to_string());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let object = StoredObject {
            path: path.to_string(),
            content_type: Some(content_type.to_string()),
            size: data.len() as u64,
            created_at: Some(Utc::now()),
            custom_metadata: HashMap::new(),
        };
        self.objects.insert(path.to_string(), (object, data));
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, AppError> {
        if self.broken_urls.contains(path) || !self.objects.contains_key(path) {
            return Err(AppError::Storage(format!("Object {} does not exist", path)));
        }
        Ok(format!("https://storage.test/{path}?token=test"))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, AppError> {
        let mut objects: Vec<StoredObject> = self
            .objects
            .iter()
            .filter(|entry| is_direct_child(prefix, entry.key()))
            .map(|entry| entry.value().0.clone())
            .collect();
        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    async fn metadata(&self, path: &str) -> Result<Option<StoredObject>, AppError> {
        Ok(self.objects.get(path).map(|entry| entry.value().0.clone()))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.objects.remove(path);
        Ok(())
    }
}
