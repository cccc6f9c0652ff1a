//! Upload payloads and object key construction.

use std::path::Path;

use bytes::Bytes;
use slug::slugify;
use time::OffsetDateTime;
use uuid::Uuid;

/// MIME type recorded when neither the client nor the filename tells us better.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const FALLBACK_STEM: &str = "upload";

/// A single file extracted from an upload request.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FilePayload {
    /// Build a payload, inferring the content type from the filename when the client sent none.
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        let filename = filename.into();
        let content_type = content_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_raw()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string()
            });

        Self {
            filename,
            content_type,
            data,
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Build a fresh object key for `original_name`, partitioned by the current UTC date.
///
/// Keys look like `[prefix/]YYYY/MM/DD/<uuid>-<slug>[.ext]` and never contain
/// parent-directory segments, so they are safe to map onto a filesystem.
pub fn object_key_for(prefix: Option<&str>, original_name: &str) -> String {
    object_key_at(
        prefix,
        original_name,
        OffsetDateTime::now_utc(),
        Uuid::new_v4(),
    )
}

pub(crate) fn object_key_at(
    prefix: Option<&str>,
    original_name: &str,
    at: OffsetDateTime,
    identifier: Uuid,
) -> String {
    let (year, month, day) = at.to_calendar_date();
    let filename = sanitize_filename(original_name);
    let key = format!("{year}/{:02}/{day:02}/{identifier}-{filename}", month as u8);

    match prefix
        .map(|value| value.trim_matches('/'))
        .filter(|value| !value.is_empty())
    {
        Some(prefix) => format!("{prefix}/{key}"),
        None => key,
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or(FALLBACK_STEM);
    let mut base = slugify(stem);
    if base.is_empty() {
        base = FALLBACK_STEM.to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

/// Check that a configured key prefix is made of plain path segments.
pub fn validate_key_prefix(prefix: &str) -> Result<(), String> {
    if prefix.contains('\\') {
        return Err("must not contain backslashes".to_string());
    }

    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return Err("must contain at least one path segment".to_string());
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(format!("invalid path segment `{segment}`"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn fixed_key(prefix: Option<&str>, name: &str) -> String {
        object_key_at(prefix, name, datetime!(2025-03-07 12:30 UTC), Uuid::nil())
    }

    #[test]
    fn keys_are_date_partitioned_and_slugified() {
        assert_eq!(
            fixed_key(None, "My Holiday Photo.PNG"),
            "2025/03/07/00000000-0000-0000-0000-000000000000-my-holiday-photo.png"
        );
    }

    #[test]
    fn prefix_is_trimmed_and_prepended() {
        assert_eq!(
            fixed_key(Some("/media/"), "a.png"),
            "media/2025/03/07/00000000-0000-0000-0000-000000000000-a.png"
        );
        assert_eq!(
            fixed_key(Some("///"), "a.png"),
            "2025/03/07/00000000-0000-0000-0000-000000000000-a.png"
        );
    }

    #[test]
    fn traversal_in_filename_is_discarded() {
        let key = fixed_key(None, "../../etc/passwd");
        assert!(!key.contains(".."));
        assert!(key.ends_with("-passwd"));
    }

    #[test]
    fn unusable_names_fall_back_to_upload() {
        assert!(fixed_key(None, "").ends_with("-upload"));
        assert!(fixed_key(None, "..").ends_with("-upload"));
        assert!(fixed_key(None, "???.txt").ends_with("-upload.txt"));
    }

    #[test]
    fn fresh_keys_are_unique() {
        let first = object_key_for(None, "a.png");
        let second = object_key_for(None, "a.png");
        assert_ne!(first, second);
    }

    #[test]
    fn content_type_is_inferred_from_filename() {
        let payload = FilePayload::new("a.png", None, Bytes::from_static(b"png"));
        assert_eq!(payload.content_type, "image/png");

        let payload = FilePayload::new("blob", Some("  ".to_string()), Bytes::new());
        assert_eq!(payload.content_type, DEFAULT_CONTENT_TYPE);

        let payload = FilePayload::new("a.png", Some("image/webp".to_string()), Bytes::new());
        assert_eq!(payload.content_type, "image/webp");
    }

    #[test]
    fn key_prefix_validation_rejects_traversal() {
        assert!(validate_key_prefix("media/uploads").is_ok());
        assert!(validate_key_prefix("/media/").is_ok());
        assert!(validate_key_prefix("media/../etc").is_err());
        assert!(validate_key_prefix("media//x").is_err());
        assert!(validate_key_prefix("media\\x").is_err());
        assert!(validate_key_prefix("/").is_err());
    }
}
