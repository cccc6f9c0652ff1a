mod health;
mod middleware;
mod state;
mod uploads;

pub use state::HttpState;
pub use uploads::UploadResponse;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use middleware::{log_responses, set_request_context};

/// Paths served by the upload handler. Both are wired to the same endpoint.
pub const UPLOAD_PATHS: [&str; 2] = ["/api/upload-file", "/bucket/upload"];

/// Assemble the service router. `upload_body_limit` caps the size of upload request bodies.
pub fn build_router(state: HttpState, upload_body_limit: usize) -> Router {
    let upload_routes = UPLOAD_PATHS
        .into_iter()
        .fold(Router::<HttpState>::new(), |router, path| {
            router.route(path, post(uploads::upload_file))
        })
        .layer(DefaultBodyLimit::max(upload_body_limit));

    Router::new()
        .merge(upload_routes)
        .route("/_health", get(health::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
