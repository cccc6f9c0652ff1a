use std::process;

use bucketdrop::{
    application::error::AppError,
    config::{self, BucketBackend},
    infra::{
        buckets,
        error::InfraError,
        http::{self, HttpState, UPLOAD_PATHS},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::validation(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Some(config::Command::CheckConfig) => {
            check_config(&settings);
            Ok(())
        }
        Some(config::Command::Serve(_)) | None => run_serve(settings).await,
    }
}

fn check_config(settings: &config::Settings) {
    let backend = match &settings.bucket.backend {
        BucketBackend::Disabled => "none".to_string(),
        BucketBackend::Filesystem { directory } => format!("filesystem ({})", directory.display()),
        BucketBackend::S3(s3) => format!(
            "s3 (bucket={}, endpoint={}, region={})",
            s3.name,
            s3.endpoint.as_deref().unwrap_or("default"),
            s3.region
        ),
    };

    info!(
        target = "bucketdrop::config",
        addr = %settings.server.addr,
        max_request_bytes = settings.uploads.max_request_bytes.get(),
        backend = %backend,
        key_prefix = settings.bucket.key_prefix.as_deref().unwrap_or(""),
        "configuration is valid"
    );
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let bucket = buckets::connect(&settings.bucket).await?;
    let state = HttpState::new(bucket);

    let upload_body_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::validation("uploads.max_request_bytes exceeds usize"))?;
    let router = http::build_router(state, upload_body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "bucketdrop::serve",
        addr = %settings.server.addr,
        paths = ?UPLOAD_PATHS,
        "listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(target = "bucketdrop::serve", "shutdown requested, draining connections");
    let _ = stop_tx.send(());

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "bucketdrop::serve",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; aborting in-flight requests"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "bucketdrop::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "bucketdrop::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
