//! Bucket backends and their construction from settings.

mod fs;
mod s3;

pub use fs::FsBucket;
pub use s3::S3Bucket;

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::uploads::Bucket;
use crate::config::{BucketBackend, BucketSettings};

use super::error::InfraError;

/// Build the configured bucket, or `None` when uploads are deliberately left unconfigured.
pub async fn connect(settings: &BucketSettings) -> Result<Option<Arc<dyn Bucket>>, InfraError> {
    let key_prefix = settings.key_prefix.clone();

    match &settings.backend {
        BucketBackend::Disabled => {
            warn!(
                target = "bucketdrop::buckets",
                "no bucket backend configured; uploads will be refused"
            );
            Ok(None)
        }
        BucketBackend::Filesystem { directory } => {
            let bucket = FsBucket::new(directory.clone(), key_prefix)
                .await
                .map_err(|err| {
                    InfraError::bucket(format!(
                        "failed to prepare upload directory `{}`: {err}",
                        directory.display()
                    ))
                })?;
            info!(
                target = "bucketdrop::buckets",
                directory = %directory.display(),
                "filesystem bucket ready"
            );
            Ok(Some(Arc::new(bucket)))
        }
        BucketBackend::S3(s3) => {
            let bucket = S3Bucket::connect(s3, key_prefix).await;
            info!(
                target = "bucketdrop::buckets",
                bucket = %s3.name,
                endpoint = s3.endpoint.as_deref().unwrap_or("default"),
                region = %s3.region,
                "s3 bucket ready"
            );
            Ok(Some(Arc::new(bucket)))
        }
    }
}
