// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage backend.
//!
//! Download URLs are V4 signed URLs, so the runtime service account needs
//! `iam.serviceAccounts.signBlob` on itself.

use crate::error::AppError;
use crate::storage::{is_direct_child, ObjectStore, StoredObject};
use crate::time_utils::offset_to_utc;
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::objects::Object;
use google_cloud_storage::sign::SignedURLOptions;
use std::sync::Arc;
use std::time::Duration;

/// Cloud Storage bucket access.
#[derive(Clone)]
pub struct GcsObjectStore {
    bucket: String,
    url_ttl: Duration,
    client: Arc<Client>,
}

impl GcsObjectStore {
    /// Connect using application default credentials.
    pub async fn new(bucket: &str, url_ttl: Duration) -> Result<Self, AppError> {
        let config = ClientConfig::default().with_auth().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Storage auth config: {}", e))
        })?;

        tracing::info!(bucket, "Connected to Cloud Storage");

        Ok(Self {
            bucket: bucket.to_string(),
            url_ttl,
            client: Arc::new(Client::new(config)),
        })
    }
}

fn is_not_found(err: &google_cloud_storage::http::Error) -> bool {
    matches!(err, google_cloud_storage::http::Error::Response(resp) if resp.code == 404)
}

fn to_stored(object: Object) -> StoredObject {
    StoredObject {
        path: object.name,
        content_type: object.content_type,
        size: u64::try_from(object.size).unwrap_or_default(),
        created_at: object.time_created.and_then(offset_to_utc),
        custom_metadata: object.metadata.unwrap_or_default(),
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let size = data.len() as u64;
        let media = Media {
            name: path.to_string().into(),
            content_type: content_type.to_string().into(),
            content_length: Some(size),
        };
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, data, &UploadType::Simple(media))
            .await
            .map_err(|e| AppError::Storage(format!("Upload of {} failed: {}", path, e)))?;

        tracing::debug!(path, size, "Uploaded object");
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, AppError> {
        if self.metadata(path).await?.is_none() {
            return Err(AppError::Storage(format!("Object {} does not exist", path)));
        }

        let options = SignedURLOptions {
            expires: self.url_ttl,
            ..Default::default()
        };
        self.client
            .signed_url(&self.bucket, path, None, None, options)
            .await
            .map_err(|e| AppError::Storage(format!("Signing URL for {} failed: {}", path, e)))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, AppError> {
        let mut objects = Vec::new();
        let mut page_token = None;

        loop {
            let request = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                delimiter: Some("/".to_string()),
                page_token: page_token.take(),
                ..Default::default()
            };
            let response = self
                .client
                .list_objects(&request)
                .await
                .map_err(|e| AppError::Storage(format!("Listing {} failed: {}", prefix, e)))?;

            objects.extend(
                response
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|o| is_direct_child(prefix, &o.name))
                    .map(to_stored),
            );

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn metadata(&self, path: &str) -> Result<Option<StoredObject>, AppError> {
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: path.to_string(),
            ..Default::default()
        };

        match self.client.get_object(&request).await {
            Ok(object) => Ok(Some(to_stored(object))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Reading metadata of {} failed: {}",
                path, e
            ))),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let request = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            object: path.to_string(),
            ..Default::default()
        };

        match self.client.delete_object(&request).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                tracing::debug!(path, "Object already absent");
                Ok(())
            }
            Err(e) => Err(AppError::Storage(format!("Deleting {} failed: {}", path, e))),
        }
    }
}
