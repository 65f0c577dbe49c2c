//! EcoPoints HTTP API Service.
//!
//! This crate provides the HTTP API for the EcoPoints recycling-rewards
//! platform, including:
//!
//! - User, store, product, and item-type management
//! - Recycling intake (points credits)
//! - Redemptions (points-for-product exchanges)
//! - Leaderboards and ranking history
//!
//! Identity is supplied by the deployment's edge (validated ids arrive in
//! requests); authentication itself is not handled here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
