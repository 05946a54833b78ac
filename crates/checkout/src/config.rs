//! Checkout configuration.

use std::fmt;
use std::str::FromStr;

use domain::CartLine;

/// Order in which cart lines acquire their product row locks.
///
/// Order lines are always persisted in submission order; only locking
/// follows this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockOrder {
    /// Ascending product id. Two checkouts over overlapping products can
    /// then never wait on each other in a cycle.
    #[default]
    ByProductId,

    /// The order the buyer submitted the lines in.
    Submitted,
}

impl LockOrder {
    /// Returns the indices of `lines` in the order they should be locked.
    pub fn sequence(&self, lines: &[CartLine]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..lines.len()).collect();
        if *self == LockOrder::ByProductId {
            indices.sort_by_key(|&i| lines[i].product_id);
        }
        indices
    }
}

impl fmt::Display for LockOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockOrder::ByProductId => f.write_str("by_product_id"),
            LockOrder::Submitted => f.write_str("submitted"),
        }
    }
}

impl FromStr for LockOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "by_product_id" => Ok(LockOrder::ByProductId),
            "submitted" => Ok(LockOrder::Submitted),
            other => Err(format!(
                "unknown lock order '{other}' (expected by_product_id or submitted)"
            )),
        }
    }
}

/// Tunables for [`CheckoutService`](crate::CheckoutService).
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutConfig {
    pub lock_order: LockOrder,
}

impl CheckoutConfig {
    pub fn with_lock_order(lock_order: LockOrder) -> Self {
        Self { lock_order }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart(ids: &[i64]) -> Vec<CartLine> {
        ids.iter().map(|&id| CartLine::new(id, 1)).collect()
    }

    #[test]
    fn test_by_product_id_sorts_stably() {
        let lines = cart(&[30, 10, 20, 10]);
        assert_eq!(LockOrder::ByProductId.sequence(&lines), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_submitted_keeps_order() {
        let lines = cart(&[30, 10, 20]);
        assert_eq!(LockOrder::Submitted.sequence(&lines), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse() {
        assert_eq!("by_product_id".parse(), Ok(LockOrder::ByProductId));
        assert_eq!(" Submitted ".parse(), Ok(LockOrder::Submitted));
        assert!("random".parse::<LockOrder>().is_err());
    }

    #[test]
    fn test_default_locks_by_product_id() {
        assert_eq!(CheckoutConfig::default().lock_order, LockOrder::ByProductId);
    }
}
