//! HTTP request handlers.

pub mod health;
pub mod item_types;
pub mod products;
pub mod rankings;
pub mod recycling;
pub mod redemptions;
pub mod stores;
pub mod users;
