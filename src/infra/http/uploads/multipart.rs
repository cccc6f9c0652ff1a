//! Multipart upload payload parsing.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tracing::debug;

use crate::application::uploads::UploadError;
use crate::domain::uploads::FilePayload;

const SOURCE: &str = "infra::http::uploads::multipart";
const FILE_FIELD: &str = "file";

/// Pull the first `file` part out of the form. Other fields are skipped unread.
pub(super) async fn read_file_field(multipart: &mut Multipart) -> Result<FilePayload, UploadError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(UploadError::MissingFile),
            Err(err) => return Err(map_multipart_error(err)),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A part without a filename is a plain text value, not a file.
        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!(target = SOURCE, "`file` field carried no filename");
            return Err(UploadError::MissingFile);
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(map_multipart_error)?;

        return Ok(FilePayload::new(filename, content_type, data));
    }
}

fn map_multipart_error(err: MultipartError) -> UploadError {
    let status = err.status();
    debug!(
        target = SOURCE,
        status = status.as_u16(),
        error = %err,
        "failed to read multipart payload"
    );
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => UploadError::PayloadTooLarge,
        _ => UploadError::MissingFile,
    }
}
