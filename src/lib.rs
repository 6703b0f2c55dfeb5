use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod certificate;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod grading;
pub mod models;
pub mod progress;
pub mod routes;
pub mod store;

pub use engine::Engine;
pub use error::{Error, Result};

/// Full HTTP application around `engine`.
pub fn app(engine: Engine) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(engine))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}
