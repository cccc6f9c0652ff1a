//! S3-compatible bucket (Cloudflare R2, MinIO, AWS S3).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::application::uploads::{Bucket, BucketError};
use crate::config::S3BucketSettings;
use crate::domain::uploads::{FilePayload, object_key_for};

const CREDENTIALS_PROVIDER: &str = "bucketdrop-config";

pub struct S3Bucket {
    client: Client,
    bucket: String,
    key_prefix: Option<String>,
}

impl S3Bucket {
    /// Build a client from settings. Static keys win; otherwise the default AWS chain is used.
    pub async fn connect(settings: &S3BucketSettings, key_prefix: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(endpoint) = settings.endpoint.as_ref() {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(keys) = settings.credentials.as_ref() {
            loader = loader.credentials_provider(Credentials::new(
                keys.access_key_id.clone(),
                keys.secret_access_key.clone(),
                None,
                None,
                CREDENTIALS_PROVIDER,
            ));
        }

        let shared = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style)
            .build();

        Self::from_client(Client::from_conf(config), settings.name.clone(), key_prefix)
    }

    pub fn from_client(client: Client, bucket: String, key_prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            key_prefix,
        }
    }
}

#[async_trait]
impl Bucket for S3Bucket {
    async fn write(&self, payload: FilePayload) -> Result<String, BucketError> {
        let key = object_key_for(self.key_prefix.as_deref(), &payload.filename);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(payload.content_type)
            .body(ByteStream::from(payload.data))
            .send()
            .await
            .map_err(|err| {
                debug!(
                    target = "bucketdrop::buckets::s3",
                    key = %key,
                    error = %DisplayErrorContext(&err),
                    "put_object failed"
                );
                // Service message (or code) only; the SDK error stays as the source.
                let message = err.message().or(err.code()).unwrap_or_default().to_string();
                BucketError::remote_with_source(message, err)
            })?;

        Ok(key)
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use bytes::Bytes;
    use mockito::Matcher;

    fn settings_for(endpoint: String) -> S3BucketSettings {
        S3BucketSettings {
            name: "media".to_string(),
            endpoint: Some(endpoint),
            region: "auto".to_string(),
            credentials: Some(StaticCredentials {
                access_key_id: "test-access".to_string(),
                secret_access_key: "test-secret".to_string(),
            }),
            force_path_style: true,
        }
    }

    #[tokio::test]
    async fn write_puts_object_under_generated_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "PUT",
                Matcher::Regex(r"^/media/uploads/\d{4}/\d{2}/\d{2}/.+-a\.png".to_string()),
            )
            .match_header("content-type", "image/png")
            .with_status(200)
            .create_async()
            .await;

        let settings = settings_for(server.url());
        let bucket = S3Bucket::connect(&settings, Some("uploads".to_string())).await;
        let key = bucket
            .write(FilePayload::new("a.png", None, Bytes::from_static(b"0123456789")))
            .await
            .expect("put should succeed");

        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-a.png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_puts_become_remote_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?><Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#,
            )
            .create_async()
            .await;

        let bucket = S3Bucket::connect(&settings_for(server.url()), None).await;
        let err = bucket
            .write(FilePayload::new("a.png", None, Bytes::from_static(b"x")))
            .await
            .expect_err("put should fail");

        assert!(matches!(err, BucketError::Remote { .. }));
        assert_eq!(err.public_message().as_deref(), Some("Access Denied"));
        assert!(std::error::Error::source(&err).is_some(), "sdk error kept as source");
    }
}
