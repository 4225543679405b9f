//! HTTP API layer for farmvisit-rs.
//!
//! This crate provides the push-notification REST surface:
//!
//! - **Endpoints**: VAPID key custody, subscription registration, cleanup,
//!   notification settings
//! - **Extractors**: Authenticated user, admin capability
//! - **Middleware**: Bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
