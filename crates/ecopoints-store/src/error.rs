//! Error types for EcoPoints storage.

use ecopoints_core::DomainError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced entity absent or inactive.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("user", "store", "product", "item type").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

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

    /// Malformed caller input (bad quantity, weight, limit, or date range).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Database operation failed. Infrastructure fault, not retried here.
    #[error("database error: {0}")]
    Database(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            DomainError::InsufficientStock { stock, requested } => {
                Self::InsufficientStock { stock, requested }
            }
            DomainError::InactiveEntity { entity, id } => Self::NotFound { entity, id },
            DomainError::InvalidQuantity(_)
            | DomainError::InvalidWeight(_)
            | DomainError::InvalidDateRange { .. }
            | DomainError::AmountOutOfRange => Self::InvalidInput(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}
