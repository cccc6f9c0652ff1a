//! Upload gateway: accepts multipart file uploads and forwards them to an object-storage bucket.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
