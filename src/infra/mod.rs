//! Infrastructure adapters and runtime bootstrap.

pub mod buckets;
pub mod error;
pub mod http;
pub mod telemetry;
