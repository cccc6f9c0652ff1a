//! Upload endpoint.
//!
//! - `handlers`: the HTTP handler and response shaping
//! - `multipart`: extraction of the single `file` field

mod handlers;
mod multipart;

pub(super) use handlers::upload_file;
pub use handlers::UploadResponse;
