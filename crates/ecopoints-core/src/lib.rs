//! Core types and domain logic for EcoPoints.
//!
//! This crate provides the foundational types used throughout the EcoPoints
//! platform:
//!
//! - **Identifiers**: `UserId`, `StoreId`, `ProductId`, `ItemTypeId`, `EventId`
//! - **Entities**: `User`, `Store`, `Product`, `ItemType`
//! - **Events**: `RecyclingEvent`, `RedemptionEvent`, `RankingSnapshot`
//! - **Ledger rules**: redemption planning, recycling point computation
//! - **Ranking**: deterministic leaderboard ordering and rank assignment
//!
//! # Points
//!
//! Points are integral and stored as `i64`. A user's balance and a product's
//! stock are never negative; any adjustment that would cross zero is rejected
//! as a whole. Recycling credits are derived from weight with a fixed
//! round-half-up policy (see [`recycling::points_for_weight`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod ranking;
pub mod recycling;
pub mod redemption;

pub use entities::{EntityStatus, ItemType, Product, Store, User};
pub use error::{DomainError, Result};
pub use events::{RankingSnapshot, RecyclingEvent, RedemptionEvent};
pub use ids::{EventId, IdError, ItemTypeId, ProductId, StoreId, UserId};
pub use ranking::{RankingStats, RedemptionFilter, StoreRankEntry, UserRankEntry};
pub use recycling::RecyclingStats;
pub use redemption::{RedemptionPlan, Verification};
