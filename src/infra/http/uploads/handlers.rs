use axum::Json;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::uploads::UploadError;
use crate::infra::telemetry::{UPLOAD_BYTES, UPLOAD_TOTAL};

use super::super::HttpState;
use super::multipart::read_file_field;

const SOURCE: &str = "infra::http::uploads";

/// Success body: `{"success":true,"key":"..."}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
}

pub(in crate::infra::http) async fn upload_file(
    State(state): State<HttpState>,
    request: Request,
) -> Response {
    match handle_upload(&state, request).await {
        Ok((key, size_bytes)) => {
            counter!(UPLOAD_TOTAL, "outcome" => "stored").increment(1);
            histogram!(UPLOAD_BYTES).record(size_bytes as f64);
            (
                StatusCode::OK,
                Json(UploadResponse { success: true, key }),
            )
                .into_response()
        }
        Err(err) => {
            counter!(UPLOAD_TOTAL, "outcome" => err.outcome()).increment(1);
            err.into_response()
        }
    }
}

async fn handle_upload(
    state: &HttpState,
    request: Request,
) -> Result<(String, usize), UploadError> {
    // Checked before the extractor runs so an unconfigured service never reads the body.
    let bucket = state.uploads.require_bucket()?;

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| {
            debug!(target = SOURCE, rejection = %rejection, "request is not multipart");
            UploadError::MissingFile
        })?;

    let payload = read_file_field(&mut multipart).await?;
    let size_bytes = payload.size_bytes();
    let key = state.uploads.store(bucket.as_ref(), payload).await?;

    Ok((key, size_bytes))
}
