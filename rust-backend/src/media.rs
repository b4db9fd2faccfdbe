//! Binary asset storage. Videos and thumbnails live in an S3-compatible bucket (MinIO in
//! development) and are served back through `GET /api/media/{key}`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use log::{info, warn};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Public prefix under which stored objects are reachable.
pub const MEDIA_ROUTE_PREFIX: &str = "/api/media/";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("bucket error: {0}")]
    Bucket(String),

    #[error("object error: {0}")]
    Object(String),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Where an uploaded file ended up. `public_id` is the object key used for later deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone)]
pub struct MediaObject {
    pub data: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put(&self, folder: &str, file_name: &str, content_type: &str, data: Bytes) -> MediaResult<StoredAsset>;
    async fn get(&self, key: &str) -> MediaResult<Option<MediaObject>>;
    async fn delete(&self, key: &str) -> MediaResult<()>;
}

/// Builds a unique key inside `folder`, keeping the original file extension.
pub fn object_key(folder: &str, file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}/{}.{}", folder, Uuid::new_v4(), ext),
        None => format!("{}/{}", folder, Uuid::new_v4()),
    }
}

pub fn public_url(key: &str) -> String {
    format!("{}{}", MEDIA_ROUTE_PREFIX, key)
}

/// Object key behind a URL produced by [`public_url`]; `None` for external URLs.
pub fn key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(MEDIA_ROUTE_PREFIX).filter(|key| !key.is_empty())
}

pub struct S3MediaStore {
    client: Client,
    bucket: String,
}

impl S3MediaStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates the bucket if `HeadBucket` cannot see it.
    pub async fn ensure_bucket(&self) -> MediaResult<()> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }
        info!("Bucket '{}' not found, creating it", self.bucket);
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| MediaError::Bucket(format!("{:?}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn put(&self, folder: &str, file_name: &str, content_type: &str, data: Bytes) -> MediaResult<StoredAsset> {
        let key = object_key(folder, file_name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| MediaError::Object(format!("upload of '{}' failed: {:?}", key, e)))?;
        Ok(StoredAsset {
            url: public_url(&key),
            public_id: key,
        })
    }

    async fn get(&self, key: &str) -> MediaResult<Option<MediaObject>> {
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(MediaError::Object(format!("fetch of '{}' failed: {:?}", key, service_error)));
            }
        };
        let content_type = output
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| MediaError::Object(format!("reading '{}' failed: {}", key, e)))?
            .into_bytes();
        Ok(Some(MediaObject { data, content_type }))
    }

    async fn delete(&self, key: &str) -> MediaResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MediaError::Object(format!("delete of '{}' failed: {:?}", key, e)))?;
        Ok(())
    }
}

/// Keeps objects in process memory. Used by tests and `MEDIA_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: RwLock<HashMap<String, MediaObject>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, folder: &str, file_name: &str, content_type: &str, data: Bytes) -> MediaResult<StoredAsset> {
        let key = object_key(folder, file_name);
        self.objects.write().await.insert(
            key.clone(),
            MediaObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredAsset {
            url: public_url(&key),
            public_id: key,
        })
    }

    async fn get(&self, key: &str) -> MediaResult<Option<MediaObject>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> MediaResult<()> {
        if self.objects.write().await.remove(key).is_none() {
            warn!("Deleting unknown media object '{}'", key);
        }
        Ok(())
    }
}

/// Removes each non-empty key, logging failures instead of returning them.
pub async fn delete_quietly(media: &dyn MediaStore, keys: &[&str]) {
    for key in keys.iter().filter(|k| !k.is_empty()) {
        if let Err(e) = media.delete(key).await {
            warn!("Failed to delete media object '{}': {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_a_sane_extension() {
        let key = object_key("videos", "Holiday Clip.MP4");
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with(".mp4"));

        let key = object_key("thumbnails", "no-extension");
        assert!(!key.contains('.'));

        let key = object_key("videos", "weird.../etc/passwd");
        assert!(!key.contains("etc"));

        assert_eq!(key_from_url(&public_url("avatars/a.png")), Some("avatars/a.png"));
        assert_eq!(key_from_url("https://ui-avatars.com/api/?name=x"), None);
    }

    #[tokio::test]
    async fn memory_store_round_trips_and_deletes() {
        let media = MemoryMediaStore::new();
        let asset = media
            .put("videos", "clip.webm", "video/webm", Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(asset.url, public_url(&asset.public_id));

        let object = media.get(&asset.public_id).await.unwrap().unwrap();
        assert_eq!(object.content_type, "video/webm");
        assert_eq!(&object.data[..], b"abc");

        delete_quietly(&media, &[asset.public_id.as_str(), ""]).await;
        assert!(media.is_empty().await);
    }
}
