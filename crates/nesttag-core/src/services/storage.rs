/// S3 object storage
use crate::error::BoxError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Presigned PUT URL; the client must send the same content type
    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
        expiration: Duration,
    ) -> Result<String, BoxError>;

    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expiration: Duration,
    ) -> Result<String, BoxError>;

    /// Stores the object and returns its public URL
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, BoxError>;

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError>;
}

/// Virtual-hosted style URL of an object
pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3ObjectStorage {
    pub fn new(client: aws_sdk_s3::Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
        expiration: Duration,
    ) -> Result<String, BoxError> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let presigning_config = PresigningConfig::expires_in(expiration)
            .map_err(|e| BoxError::Storage(format!("Invalid expiration duration: {}", e)))?;

        let presigned_request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .presigned(presigning_config)
            .await
            .map_err(|e| BoxError::Storage(format!("Failed to generate presigned URL: {}", e)))?;

        Ok(presigned_request.uri().to_string())
    }

    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expiration: Duration,
    ) -> Result<String, BoxError> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let presigning_config = PresigningConfig::expires_in(expiration)
            .map_err(|e| BoxError::Storage(format!("Invalid expiration duration: {}", e)))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| BoxError::Storage(format!("Failed to generate presigned URL: {}", e)))?;

        Ok(presigned_request.uri().to_string())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, BoxError> {
        use aws_sdk_s3::primitives::ByteStream;

        let size = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| BoxError::Storage(format!("S3 upload failed: {}", e)))?;

        tracing::info!(bucket = bucket, size = size, "Uploaded object");
        Ok(object_url(bucket, &self.region, key))
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| BoxError::Storage(format!("Invalid object key: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| BoxError::Storage(format!("Invalid delete request: {}", e)))?;

        let result = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| BoxError::Storage(format!("S3 delete failed: {}", e)))?;

        let errors = result.errors();
        if !errors.is_empty() {
            return Err(BoxError::Storage(format!(
                "S3 failed to delete {} of {} objects",
                errors.len(),
                keys.len()
            )));
        }

        tracing::info!(bucket = bucket, count = keys.len(), "Deleted objects");
        Ok(())
    }
}
