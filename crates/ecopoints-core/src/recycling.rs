//! Recycling intake rules.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Aggregate statistics over all recycling deposits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecyclingStats {
    /// Number of deposits recorded.
    pub total_deposits: i64,
    /// Total weight deposited, in kilograms.
    pub total_weight: f64,
    /// Total points credited for deposits.
    pub total_points_awarded: i64,
}

/// Validate a recycling weight.
///
/// Weights must be finite and strictly positive.
///
/// # Errors
///
/// Returns [`DomainError::InvalidWeight`] otherwise.
pub fn validate_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidWeight(weight))
    }
}

/// Compute the points credited for a deposit.
///
/// Points are integral, so the product `weight * points_per_unit` is rounded
/// half-up to the nearest integer: 2.5 becomes 3, 2.4 becomes 2. The policy
/// is fixed; both storage backends and all tests rely on it.
///
/// # Errors
///
/// Returns [`DomainError::InvalidWeight`] for non-positive or non-finite
/// weights, and [`DomainError::AmountOutOfRange`] if the product does not fit
/// in `i64`.
#[allow(clippy::cast_precision_loss)]
pub fn points_for_weight(weight: f64, points_per_unit: f64) -> Result<i64> {
    validate_weight(weight)?;
    if !(points_per_unit.is_finite() && points_per_unit > 0.0) {
        return Err(DomainError::AmountOutOfRange);
    }

    // Round half-up. Both operands are positive, so floor(x + 0.5) is exact.
    let raw = (weight * points_per_unit + 0.5).floor();
    if !raw.is_finite() || raw > i64::MAX as f64 {
        return Err(DomainError::AmountOutOfRange);
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok(raw as i64)
}
