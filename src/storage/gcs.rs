// src/storage/gcs.rs

use async_trait::async_trait;
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::{
        objects::{
            download::Range,
            get::GetObjectRequest,
            list::ListObjectsRequest,
            upload::{Media, UploadObjectRequest, UploadType},
        },
        Error as HttpError,
    },
};
use tracing::{debug, info};

use super::{BlobStore, StorageError};

/// A Google Cloud Storage bucket, authenticated with Application Default Credentials.
pub struct GcsBucket {
    client: Client,
    bucket: String,
}

impl GcsBucket {
    pub async fn connect(bucket: impl Into<String>) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| StorageError::Remote {
                bucket: bucket.clone(),
                key: String::new(),
                source: Box::new(e),
            })?;
        info!(%bucket, "GCS client ready");
        Ok(Self {
            client: Client::new(config),
            bucket,
        })
    }

    fn map_error(&self, key: &str, err: HttpError) -> StorageError {
        match err {
            HttpError::Response(resp) if resp.code == 404 => StorageError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            },
            other => StorageError::Remote {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: Box::new(other),
            },
        }
    }
}

#[async_trait]
impl BlobStore for GcsBucket {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let mut media = Media::new(key.to_string());
        media.content_length = Some(data.len() as u64);
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, data, &UploadType::Simple(media))
            .await
            .map_err(|e| self.map_error(key, e))?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let request = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                page_token: page_token.take(),
                ..Default::default()
            };
            let resp = self
                .client
                .list_objects(&request)
                .await
                .map_err(|e| self.map_error(prefix, e))?;

            keys.extend(resp.items.unwrap_or_default().into_iter().map(|o| o.name));
            match resp.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(prefix, objects = keys.len(), "listed bucket");
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        };
        self.client
            .download_object(&request, &Range::default())
            .await
            .map_err(|e| self.map_error(key, e))
    }
}
