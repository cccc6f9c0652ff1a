//! Domain types shared by the upload pipeline.

pub mod uploads;
