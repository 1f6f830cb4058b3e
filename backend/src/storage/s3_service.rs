use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Plant photos, keyed by owner and content hash.
#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 upload failed: {0}")]
    Upload(String),
    #[error("S3 download failed: {0}")]
    Download(String),
    #[error("Unsupported image type: {0}")]
    UnsupportedFormat(String),
    #[error("Upload of {size} bytes exceeds the 50 MiB limit")]
    TooLarge { size: usize },
}

pub struct StoredImage {
    pub key: String,
    pub hash: String,
}

pub fn content_hash(image_data: &[u8]) -> String {
    hex::encode(Sha256::digest(image_data))
}

pub fn image_key(user_id: Uuid, hash: &str, extension: &str) -> String {
    format!("images/{}/{}.{}", user_id, hash, extension)
}

pub fn extension_for(mime_type: &str) -> Result<&'static str, S3ServiceError> {
    match mime_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        other => Err(S3ServiceError::UnsupportedFormat(other.to_string())),
    }
}

pub fn mime_type_for_key(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn check_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
    if image_data.len() > MAX_UPLOAD_BYTES {
        return Err(S3ServiceError::TooLarge {
            size: image_data.len(),
        });
    }
    Ok(())
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    /// Re-uploading identical bytes for the same user overwrites the same key.
    pub async fn store_upload(
        &self,
        user_id: Uuid,
        image_data: &[u8],
        mime_type: &str,
    ) -> Result<StoredImage, S3ServiceError> {
        check_size(image_data)?;
        let hash = content_hash(image_data);
        let key = image_key(user_id, &hash, extension_for(mime_type)?);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(image_data.to_vec()))
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::Upload(e.to_string()))?;

        log::debug!("Uploaded {} bytes to s3://{}/{}", image_data.len(), self.bucket_name, key);
        Ok(StoredImage { key, hash })
    }

    pub async fn get_image(&self, key: &str) -> Result<Vec<u8>, S3ServiceError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| S3ServiceError::Download(e.to_string()))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| S3ServiceError::Download(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}
