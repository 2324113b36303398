//! HTTP API handlers

pub mod acknowledge;
pub mod auth;
pub mod feed;
pub mod health;

pub use acknowledge::acknowledge;
pub use auth::auth_middleware;
pub use feed::{get_acknowledgments, get_feed};
pub use health::health_routes;
