//! Read-only order history for a buyer.

use domain::{BuyerId, OrderDetails, OrderId};
use store::OrderReader;

use crate::error::{CheckoutError, Result};

/// Looks up a buyer's committed orders. Runs outside any unit of work.
pub struct OrderHistory<R> {
    reader: R,
}

impl<R: OrderReader> OrderHistory<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// All orders of `buyer_id`, newest first, each with lines and snapshots.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, buyer_id: BuyerId) -> Result<Vec<OrderDetails>> {
        Ok(self.reader.orders_for_buyer(buyer_id).await?)
    }

    /// One order of `buyer_id`. Orders of other buyers are reported as not
    /// found.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, buyer_id: BuyerId, order_id: OrderId) -> Result<OrderDetails> {
        self.reader
            .order_for_buyer(buyer_id, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }
}
