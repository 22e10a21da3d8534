use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::CollaboratorError;
use crate::memory::{archive_key, OutcomeArchive};

/// Uploads winning postings as Markdown to `jobs/<user>/<generation>.md`.
#[derive(Clone)]
pub struct S3OutcomeArchive {
    s3: S3Client,
    bucket: String,
}

impl S3OutcomeArchive {
    pub fn new(s3: S3Client, bucket: String) -> Self {
        Self { s3, bucket }
    }
}

#[async_trait]
impl OutcomeArchive for S3OutcomeArchive {
    async fn archive(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        markdown: String,
    ) -> Result<String, CollaboratorError> {
        let key = archive_key(user_id, generation_id);

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(Bytes::from(markdown)))
            .content_type("text/markdown; charset=utf-8")
            .send()
            .await
            .map_err(|e| CollaboratorError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Archived posting to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}
