//! Upload orchestration: bucket capability, error taxonomy, and the write path.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, info};

use crate::application::error::ErrorReport;
use crate::domain::uploads::FilePayload;

const SOURCE: &str = "application::uploads";

/// Body returned when a storage failure carries no usable message.
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

/// Object storage capability consumed by the upload handler.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Store `payload` and return the key the object was written under.
    async fn write(&self, payload: FilePayload) -> Result<String, BucketError>;

    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;
}

/// Errors raised by bucket backends.
#[derive(Debug, Error)]
pub enum BucketError {
    #[error("invalid object key `{key}`")]
    InvalidKey { key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl BucketError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Remote {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Message safe to hand back to the caller, or `None` when the error has nothing to say.
    pub fn public_message(&self) -> Option<String> {
        let message = self.to_string();
        let trimmed = message.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Terminal outcomes of a failed upload request.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("R2 bucket not configured")]
    BucketNotConfigured,
    #[error("No file provided")]
    MissingFile,
    #[error("File is too large")]
    PayloadTooLarge,
    #[error("storage write failed")]
    Storage(#[from] BucketError),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::MissingFile => StatusCode::BAD_REQUEST,
            UploadError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::BucketNotConfigured | UploadError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            UploadError::Storage(err) => err
                .public_message()
                .unwrap_or_else(|| GENERIC_UPLOAD_FAILURE.to_string()),
            other => other.to_string(),
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            UploadError::BucketNotConfigured => "unconfigured",
            UploadError::MissingFile | UploadError::PayloadTooLarge => "rejected",
            UploadError::Storage(_) => "failed",
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.public_message();
        let report = ErrorReport::from_error(SOURCE, status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}

/// Holds the optional bucket and performs the storage write for validated payloads.
#[derive(Clone)]
pub struct UploadService {
    bucket: Option<Arc<dyn Bucket>>,
}

impl UploadService {
    pub fn new(bucket: Option<Arc<dyn Bucket>>) -> Self {
        Self { bucket }
    }

    /// Return the configured bucket, failing before any request body is touched.
    pub fn require_bucket(&self) -> Result<Arc<dyn Bucket>, UploadError> {
        self.bucket.clone().ok_or(UploadError::BucketNotConfigured)
    }

    pub async fn store(
        &self,
        bucket: &dyn Bucket,
        payload: FilePayload,
    ) -> Result<String, UploadError> {
        let filename = payload.filename.clone();
        let size_bytes = payload.size_bytes();

        match bucket.write(payload).await {
            Ok(key) => {
                info!(
                    target = SOURCE,
                    backend = bucket.backend(),
                    filename = %filename,
                    size_bytes,
                    key = %key,
                    "upload stored"
                );
                Ok(key)
            }
            Err(err) => {
                error!(
                    target = SOURCE,
                    backend = bucket.backend(),
                    filename = %filename,
                    size_bytes,
                    error = %err,
                    "upload failed"
                );
                Err(UploadError::Storage(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct RecordingBucket {
        result: Mutex<Option<Result<String, BucketError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingBucket {
        fn returning(result: Result<String, BucketError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Bucket for RecordingBucket {
        async fn write(&self, payload: FilePayload) -> Result<String, BucketError> {
            self.seen.lock().unwrap().push(payload.filename);
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("bucket called more than once")
        }

        fn backend(&self) -> &'static str {
            "recording"
        }
    }

    fn payload() -> FilePayload {
        FilePayload::new("a.png", None, Bytes::from_static(b"0123456789"))
    }

    #[test]
    fn missing_bucket_is_a_configuration_error() {
        let service = UploadService::new(None);
        let err = service.require_bucket().err().expect("bucket should be missing");
        assert!(matches!(err, UploadError::BucketNotConfigured));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "R2 bucket not configured");
    }

    #[tokio::test]
    async fn store_returns_bucket_key() {
        let bucket = RecordingBucket::returning(Ok("k1".to_string()));
        let service = UploadService::new(None);

        let key = service.store(&bucket, payload()).await.expect("stored");

        assert_eq!(key, "k1");
        assert_eq!(*bucket.seen.lock().unwrap(), vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn storage_failures_surface_the_backend_message() {
        let bucket = RecordingBucket::returning(Err(BucketError::remote("quota exceeded")));
        let service = UploadService::new(None);

        let err = service.store(&bucket, payload()).await.expect_err("should fail");

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "quota exceeded");
        assert_eq!(err.outcome(), "failed");
    }

    #[test]
    fn blank_storage_messages_fall_back_to_generic_text() {
        let err = UploadError::from(BucketError::remote("   "));
        assert_eq!(err.public_message(), GENERIC_UPLOAD_FAILURE);
    }

    #[test]
    fn validation_errors_map_to_client_statuses() {
        assert_eq!(UploadError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::MissingFile.public_message(), "No file provided");
        assert_eq!(
            UploadError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn responses_carry_plain_text_and_a_report() {
        let response = UploadError::from(BucketError::remote("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["storage write failed", "boom"]);
    }
}
