//! Application services sitting between the HTTP surface and storage backends.

pub mod error;
pub mod uploads;
