//! HTTP API handlers

pub mod health;
pub mod import;
pub mod resolve;
pub mod templates;

pub use health::health_routes;
pub use import::import_routes;
pub use resolve::resolve_routes;
pub use templates::template_routes;
