//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

use std::{
    net::SocketAddr,
    num::NonZeroU64,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::uploads::validate_key_prefix;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bucketdrop";
const ENV_PREFIX: &str = "BUCKETDROP";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_S3_REGION: &str = "auto";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub uploads: UploadSettings,
    pub bucket: BucketSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct BucketSettings {
    pub backend: BucketBackend,
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub enum BucketBackend {
    /// No bucket; the upload handler answers every request with a configuration error.
    Disabled,
    S3(S3BucketSettings),
    Filesystem { directory: PathBuf },
}

#[derive(Clone)]
pub struct S3BucketSettings {
    pub name: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub credentials: Option<StaticCredentials>,
    pub force_path_style: bool,
}

#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

// Hand-written so secrets never reach logs.
impl std::fmt::Debug for S3BucketSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BucketSettings")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("static_credentials", &self.credentials.is_some())
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_from(cli, environment())
}

/// `BUCKETDROP_<SECTION>__<KEY>`, e.g. `BUCKETDROP_BUCKET__BACKEND=s3`.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn load_from(cli: &CliArgs, environment: Environment) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CheckConfig) | None => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    uploads: RawUploadSettings,
    bucket: RawBucketSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
        if let Some(backend) = overrides.bucket_backend.as_ref() {
            self.bucket.backend = Some(backend.clone());
        }
        if let Some(name) = overrides.bucket_name.as_ref() {
            self.bucket.name = Some(name.clone());
        }
        if let Some(endpoint) = overrides.bucket_endpoint.as_ref() {
            self.bucket.endpoint = Some(endpoint.clone());
        }
        if let Some(region) = overrides.bucket_region.as_ref() {
            self.bucket.region = Some(region.clone());
        }
        if let Some(directory) = overrides.bucket_directory.as_ref() {
            self.bucket.directory = Some(directory.clone());
        }
        if let Some(prefix) = overrides.bucket_key_prefix.as_ref() {
            self.bucket.key_prefix = Some(prefix.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            uploads,
            bucket,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            uploads: build_upload_settings(uploads)?,
            bucket: build_bucket_settings(bucket)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings { max_request_bytes })
}

fn build_bucket_settings(bucket: RawBucketSettings) -> Result<BucketSettings, LoadError> {
    let key_prefix = match non_blank(bucket.key_prefix) {
        Some(prefix) => {
            validate_key_prefix(&prefix)
                .map_err(|reason| LoadError::invalid("bucket.key_prefix", reason))?;
            Some(prefix.trim_matches('/').to_string())
        }
        None => None,
    };

    let backend_name = non_blank(bucket.backend)
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_else(|| "none".to_string());

    let backend = match backend_name.as_str() {
        "none" | "disabled" => BucketBackend::Disabled,
        "filesystem" | "fs" => {
            let directory = bucket.directory.filter(|dir| !dir.as_os_str().is_empty());
            let directory = directory.ok_or_else(|| {
                LoadError::invalid(
                    "bucket.directory",
                    "required when bucket.backend is `filesystem`",
                )
            })?;
            BucketBackend::Filesystem { directory }
        }
        "s3" | "r2" => {
            let name = non_blank(bucket.name).ok_or_else(|| {
                LoadError::invalid("bucket.name", "required when bucket.backend is `s3`")
            })?;
            let region =
                non_blank(bucket.region).unwrap_or_else(|| DEFAULT_S3_REGION.to_string());
            let endpoint = non_blank(bucket.endpoint);

            let credentials = match (
                non_blank(bucket.access_key_id),
                non_blank(bucket.secret_access_key),
            ) {
                (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                    access_key_id,
                    secret_access_key,
                }),
                (None, None) => None,
                _ => {
                    return Err(LoadError::invalid(
                        "bucket.access_key_id",
                        "access_key_id and secret_access_key must be set together",
                    ));
                }
            };

            BucketBackend::S3(S3BucketSettings {
                name,
                endpoint,
                region,
                credentials,
                force_path_style: bucket.force_path_style.unwrap_or(true),
            })
        }
        other => {
            return Err(LoadError::invalid(
                "bucket.backend",
                format!("unknown backend `{other}` (expected none, s3, or filesystem)"),
            ));
        }
    };

    Ok(BucketSettings {
        backend,
        key_prefix,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    max_request_bytes: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawBucketSettings {
    backend: Option<String>,
    key_prefix: Option<String>,
    name: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    force_path_style: Option<bool>,
    directory: Option<PathBuf>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
