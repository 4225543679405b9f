//! Core business logic for farmvisit-rs.

pub mod services;

pub use services::*;
