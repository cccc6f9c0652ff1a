use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the bucketdrop binary.
#[derive(Debug, Parser)]
#[command(
    name = "bucketdrop",
    version,
    about = "Multipart upload gateway for S3-compatible buckets"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BUCKETDROP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the upload HTTP service.
    Serve(Box<ServeArgs>),
    /// Resolve configuration, print a summary, and exit.
    #[command(name = "check-config")]
    CheckConfig,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the bucket backend (none|s3|filesystem).
    #[arg(long = "bucket-backend", value_name = "BACKEND")]
    pub bucket_backend: Option<String>,

    /// Override the S3 bucket name.
    #[arg(long = "bucket-name", value_name = "NAME")]
    pub bucket_name: Option<String>,

    /// Override the S3 endpoint URL (for R2: https://<account>.r2.cloudflarestorage.com).
    #[arg(long = "bucket-endpoint", value_name = "URL")]
    pub bucket_endpoint: Option<String>,

    /// Override the S3 region.
    #[arg(long = "bucket-region", value_name = "REGION")]
    pub bucket_region: Option<String>,

    /// Override the directory used by the filesystem backend.
    #[arg(long = "bucket-directory", value_name = "PATH")]
    pub bucket_directory: Option<PathBuf>,

    /// Override the prefix prepended to every object key.
    #[arg(long = "bucket-key-prefix", value_name = "PREFIX")]
    pub bucket_key_prefix: Option<String>,
}
