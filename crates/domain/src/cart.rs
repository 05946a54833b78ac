//! Cart input accepted by checkout.

use serde::{Deserialize, Serialize};

use crate::{DomainError, ProductId};

/// One requested product and quantity in a checkout cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Rejects lines asking for zero units.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quantity_is_rejected() {
        let line = CartLine::new(1, 0);
        assert_eq!(
            line.validate(),
            Err(DomainError::InvalidQuantity { quantity: 0 })
        );
        assert!(CartLine::new(1, 3).validate().is_ok());
    }

    #[test]
    fn test_deserializes_from_request_shape() {
        let line: CartLine =
            serde_json::from_str(r#"{"product_id": 12, "quantity": 2}"#).unwrap();
        assert_eq!(line, CartLine::new(12, 2));
    }
}
