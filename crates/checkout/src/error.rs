//! Checkout error types.

use domain::{AddressId, BuyerId, DomainError, OrderId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can end a checkout or an order lookup.
///
/// Every checkout error is reported only after the unit of work it
/// happened in has been aborted.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The shipping address does not exist or belongs to another buyer.
    #[error("Address {address_id} not found or not owned by buyer {buyer_id}")]
    AddressNotOwned {
        address_id: AddressId,
        buyer_id: BuyerId,
    },

    /// A cart line names a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A cart line asks for more units than the locked row holds.
    #[error("Stock for product '{product_name}' is not enough (remaining: {available})")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The cart itself is unusable (empty, zero quantity, amount overflow).
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// Waiting for a product row lock timed out. Retryable.
    #[error("Lock timeout: {0}")]
    LockTimeout(StoreError),

    /// Any other storage failure during lock, read, write or commit.
    #[error("Persistence failure: {0}")]
    Persistence(StoreError),

    /// The order does not exist or belongs to another buyer.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An unexpected fault inside the orchestrator.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Returns true if the caller supplied input that can never succeed as is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::AddressNotOwned { .. }
                | CheckoutError::ProductNotFound(_)
                | CheckoutError::InsufficientStock { .. }
                | CheckoutError::InvalidCart(_)
                | CheckoutError::OrderNotFound(_)
        )
    }

    /// Returns true if resubmitting the whole checkout may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::LockTimeout(_) | CheckoutError::Persistence(_)
        )
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::AddressNotOwned { .. } => "address_not_owned",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::InvalidCart(_) => "invalid_cart",
            CheckoutError::LockTimeout(_) => "lock_timeout",
            CheckoutError::Persistence(_) => "persistence",
            CheckoutError::OrderNotFound(_) => "order_not_found",
            CheckoutError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        if err.is_lock_timeout() {
            CheckoutError::LockTimeout(err)
        } else {
            CheckoutError::Persistence(err)
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::InvalidCart(err.to_string())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
