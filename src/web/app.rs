use super::{MAX_REQUEST_BODY_BYTES, REMOVE_BACKGROUND_PATH, SharedProvider, handlers};
use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::path::Path;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_app(provider: SharedProvider, public_dir: &Path) -> Router {
    let relay = post(handlers::remove_background)
        .fallback(handlers::method_not_allowed)
        // Limit the whole upload body; the image field itself is checked while it streams
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));

    Router::new()
        .route(REMOVE_BACKGROUND_PATH, relay)
        // Entry page and client assets
        .fallback_service(ServeDir::new(public_dir))
        // Uploads may come from pages served elsewhere
        .layer(CorsLayer::permissive())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        // Provide the shared state
        .with_state(provider)
}
