//! Ledger entities: users, stores, products, and recyclable item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ItemTypeId, ProductId, StoreId, UserId};

/// Lifecycle status shared by all entities.
///
/// Nothing is physically deleted; deactivation flips the status to
/// `Inactive`, after which the entity is treated as absent by every
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// Entity is live and usable.
    Active,
    /// Entity has been soft-deleted.
    Inactive,
}

impl EntityStatus {
    /// Whether the entity may participate in operations.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Stable string form used by the storage layer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A registered user holding a points balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Accumulated points. Never negative.
    pub points_balance: i64,
    /// Lifecycle status.
    pub status: EntityStatus,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with a zero balance.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            points_balance: 0,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// A participating store that accepts recycling and offers products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Store identifier.
    pub id: StoreId,
    /// Store name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Lifecycle status.
    pub status: EntityStatus,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Create a new active store.
    #[must_use]
    pub fn new(id: StoreId, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// A product redeemable for points. Belongs to exactly one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Owning store.
    pub store_id: StoreId,
    /// Product name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price of one unit, in points. Always positive.
    pub cost_in_points: i64,
    /// Units available. Never negative.
    pub stock: i64,
    /// Lifecycle status.
    pub status: EntityStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new active product.
    #[must_use]
    pub fn new(
        id: ProductId,
        store_id: StoreId,
        name: impl Into<String>,
        cost_in_points: i64,
        stock: i64,
    ) -> Self {
        Self {
            id,
            store_id,
            name: name.into(),
            description: None,
            cost_in_points,
            stock,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// A recyclable item type with its points rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemType {
    /// Item type identifier.
    pub id: ItemTypeId,
    /// Material name ("PET plastic", "aluminum", ...).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Points credited per kilogram deposited.
    pub points_per_unit: f64,
    /// Lifecycle status.
    pub status: EntityStatus,
}

impl ItemType {
    /// Create a new active item type.
    #[must_use]
    pub fn new(id: ItemTypeId, name: impl Into<String>, points_per_unit: f64) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            points_per_unit,
            status: EntityStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_empty_and_active() {
        let user = User::new(UserId::generate(), "Ada", "ada@example.com");
        assert_eq!(user.points_balance, 0);
        assert!(user.status.is_active());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [EntityStatus::Active, EntityStatus::Inactive] {
            assert_eq!(EntityStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EntityStatus::parse("deleted"), None);
    }
}
