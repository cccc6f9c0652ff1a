//! Filesystem-backed bucket.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use crate::application::uploads::{Bucket, BucketError};
use crate::domain::uploads::{FilePayload, object_key_for};

/// Stores objects as plain files below a root directory, keyed by relative path.
#[derive(Debug)]
pub struct FsBucket {
    root: PathBuf,
    key_prefix: Option<String>,
}

impl FsBucket {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub async fn new(root: PathBuf, key_prefix: Option<String>) -> Result<Self, std::io::Error> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root, key_prefix })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, BucketError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(BucketError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }

    async fn write_at(&self, key: &str, data: &[u8]) -> Result<(), BucketError> {
        let absolute = self.resolve(key)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(err) = written {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(BucketError::Io(err));
        }

        Ok(())
    }
}

#[async_trait]
impl Bucket for FsBucket {
    async fn write(&self, payload: FilePayload) -> Result<String, BucketError> {
        let key = object_key_for(self.key_prefix.as_deref(), &payload.filename);
        self.write_at(&key, &payload.data).await?;
        Ok(key)
    }

    fn backend(&self) -> &'static str {
        "filesystem"
    }
}
