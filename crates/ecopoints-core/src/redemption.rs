//! Redemption rules: the checks and cost computation behind a
//! points-for-product exchange.
//!
//! The storage backends run these checks inside their own atomicity scope
//! (a SQL transaction or a mutex section), so the rules live here exactly
//! once.

use serde::{Deserialize, Serialize};

use crate::entities::{Product, Store, User};
use crate::error::{DomainError, Result};

/// A validated redemption, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionPlan {
    /// Total points to debit: `cost_in_points * quantity`.
    pub cost: i64,
}

/// Compute the total cost of `quantity` units at `cost_in_points` each.
///
/// # Errors
///
/// Returns [`DomainError::InvalidQuantity`] if `quantity < 1` and
/// [`DomainError::AmountOutOfRange`] on `i64` overflow.
pub fn redemption_cost(cost_in_points: i64, quantity: i64) -> Result<i64> {
    if quantity < 1 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    cost_in_points
        .checked_mul(quantity)
        .ok_or(DomainError::AmountOutOfRange)
}

/// Check every redemption precondition and produce a plan.
///
/// Preconditions, in the order they are reported:
///
/// 1. `quantity >= 1`
/// 2. user, owning store, and product are all active
/// 3. the user's balance covers the cost
/// 4. the product's stock covers the quantity
///
/// # Errors
///
/// Returns the corresponding [`DomainError`] for the first violated
/// precondition. The caller has already resolved the entities, so absence is
/// reported by the storage layer, not here.
pub fn check_redemption(
    user: &User,
    store: &Store,
    product: &Product,
    quantity: i64,
) -> Result<RedemptionPlan> {
    let cost = redemption_cost(product.cost_in_points, quantity)?;

    if !user.status.is_active() {
        return Err(DomainError::InactiveEntity {
            entity: "user",
            id: user.id.to_string(),
        });
    }
    if !store.status.is_active() {
        return Err(DomainError::InactiveEntity {
            entity: "store",
            id: store.id.to_string(),
        });
    }
    if !product.status.is_active() {
        return Err(DomainError::InactiveEntity {
            entity: "product",
            id: product.id.to_string(),
        });
    }

    if user.points_balance < cost {
        return Err(DomainError::InsufficientBalance {
            balance: user.points_balance,
            required: cost,
        });
    }
    if product.stock < quantity {
        return Err(DomainError::InsufficientStock {
            stock: product.stock,
            requested: quantity,
        });
    }

    Ok(RedemptionPlan { cost })
}

/// Outcome of a read-only redemption pre-flight check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    /// Whether the redemption would succeed right now.
    pub allowed: bool,
    /// Human-readable reason when not allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Total cost in points of the proposed redemption.
    pub cost: i64,
}

impl Verification {
    /// A verification that passed.
    #[must_use]
    pub const fn allowed(cost: i64) -> Self {
        Self {
            allowed: true,
            reason: None,
            cost,
        }
    }

    /// A verification that failed a business rule.
    #[must_use]
    pub fn denied(reason: impl Into<String>, cost: i64) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            cost,
        }
    }
}
