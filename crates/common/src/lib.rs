//! Common utilities and shared types for farmvisit-rs.
//!
//! This crate provides foundational components used across all farmvisit-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID row ids and bearer tokens via [`id`]
//!
//! # Example
//!
//! ```no_run
//! use farmvisit_common::{AppResult, Config, new_id};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = new_id();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{new_id, new_token};
