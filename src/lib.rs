//! Fraud Scoring Service
//!
//! HTTP API that scores credit-card transactions for fraud probability.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   FRAUD SCORING API                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  POST /predict                                           │
//! │     │                                                    │
//! │     ▼                                                    │
//! │  validate ─► assemble ─► scale ─► infer ─► decide        │
//! │                            │        │                    │
//! │                    ┌───────┴──┐ ┌───┴────────┐           │
//! │                    │ scalers  │ │ classifier │  (Arc)    │
//! │                    │ (JSON)   │ │ (ONNX)     │           │
//! │                    └──────────┘ └────────────┘           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use model::Artifacts;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` only when the router is built without a loaded model
    pub artifacts: Option<Arc<Artifacts>>,
}

impl AppState {
    pub fn new(artifacts: Artifacts) -> Self {
        Self {
            artifacts: Some(Arc::new(artifacts)),
        }
    }

    pub fn without_artifacts() -> Self {
        Self { artifacts: None }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, method and header, with credentials.
///
/// tower-http refuses `Any` together with credentials, so the request's own
/// values are mirrored back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
