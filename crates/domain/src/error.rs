//! Domain error types.

use thiserror::Error;

/// Errors raised by pure domain computations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A price column did not hold a valid non-negative decimal amount.
    #[error("Invalid amount: {input:?}")]
    InvalidAmount { input: String },

    /// A monetary computation exceeded the representable range.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: &'static str },

    /// A cart line asked for zero units.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// An order must carry at least one line.
    #[error("Order has no lines")]
    NoLines,
}
