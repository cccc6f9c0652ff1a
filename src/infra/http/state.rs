use std::sync::Arc;

use crate::application::uploads::{Bucket, UploadService};

#[derive(Clone)]
pub struct HttpState {
    pub uploads: Arc<UploadService>,
}

impl HttpState {
    pub fn new(bucket: Option<Arc<dyn Bucket>>) -> Self {
        Self {
            uploads: Arc::new(UploadService::new(bucket)),
        }
    }
}
