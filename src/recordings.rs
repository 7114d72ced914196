//! Finished-recording storage.
//!
//! The publisher's client uploads the recorded session as one blob after
//! the broadcast stops; the session core is not involved beyond the HTTP
//! route that drives this store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::RecordingsConfig;
use crate::error::AppError;

#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Store a finished recording under a human-readable name and return
    /// a retrievable URL.
    async fn store(&self, name: &str, data: Bytes) -> Result<String, AppError>;
}

pub struct S3RecordingStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3RecordingStore {
    pub async fn from_config(config: &RecordingsConfig) -> Self {
        use aws_sdk_s3::config::Region;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    fn object_key(name: &str) -> String {
        format!("recordings/{name}.webm")
    }
}

#[async_trait]
impl RecordingStore for S3RecordingStore {
    async fn store(&self, name: &str, data: Bytes) -> Result<String, AppError> {
        let key = Self::object_key(name);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("video/webm")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put_object {key}: {e}")))?;

        tracing::info!(%key, size, "recording stored");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_places_recordings_under_prefix() {
        assert_eq!(
            S3RecordingStore::object_key("show-42"),
            "recordings/show-42.webm"
        );
    }
}
