//! roster-import library interface
//!
//! Exposes the resolution engine, batch pipeline and HTTP router for the
//! binary and for integration testing.

pub mod api;
pub mod batch;
pub mod error;
pub mod models;
pub mod report;
pub mod resolve;
pub mod store;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::batch::BatchProcessor;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub processor: BatchProcessor,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last batch-level error, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(processor: BatchProcessor) -> Self {
        Self {
            processor,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::import_routes())
        .merge(api::template_routes())
        .merge(api::resolve_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
