//! Error types for EcoPoints domain logic.

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors that can occur when applying ledger business rules.
///
/// The storage layer maps these onto its own error type; the distinctions are
/// preserved end to end so callers can render a specific message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Insufficient points for a debit.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current points balance.
        balance: i64,
        /// Points required by the operation.
        required: i64,
    },

    /// Insufficient stock for a decrement.
    #[error("insufficient stock: stock={stock}, requested={requested}")]
    InsufficientStock {
        /// Current stock level.
        stock: i64,
        /// Units requested.
        requested: i64,
    },

    /// A referenced entity exists but is deactivated.
    ///
    /// Callers treat this the same as the entity being absent.
    #[error("{entity} is inactive: {id}")]
    InactiveEntity {
        /// Entity kind ("user", "store", "product", "item type").
        entity: &'static str,
        /// The entity identifier.
        id: String,
    },

    /// Redemption quantity must be at least 1.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Recycling weight must be strictly positive and finite.
    #[error("invalid weight: {0}")]
    InvalidWeight(f64),

    /// A date filter with `from` after `to`.
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Lower bound supplied by the caller.
        from: chrono::NaiveDate,
        /// Upper bound supplied by the caller.
        to: chrono::NaiveDate,
    },

    /// A points computation overflowed `i64`.
    #[error("points amount out of range")]
    AmountOutOfRange,
}
