//! Order headers, order lines and the assembler that builds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AddressId, BuyerId, DomainError, Money, OrderId, OrderLineId, ProductId, ProductSnapshot,
    SnapshotId, StoreId,
};

/// A persisted order header.
///
/// `total` is the exact sum of the order's line totals, computed once when
/// the order was assembled and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub address_id: AddressId,
    pub total: Money,
    pub invoice_code: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted order line referencing the snapshot frozen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub snapshot_id: SnapshotId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub line_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line staged during checkout, not yet attached to a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedLine {
    pub snapshot_id: SnapshotId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub line_total: Money,
    pub created_at: DateTime<Utc>,
}

impl StagedLine {
    /// Attaches the parent order and the identifier assigned by storage.
    pub fn into_line(self, id: OrderLineId, order_id: OrderId) -> OrderLine {
        OrderLine {
            id,
            order_id,
            snapshot_id: self.snapshot_id,
            store_id: self.store_id,
            quantity: self.quantity,
            line_total: self.line_total,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// An order header that has been assembled but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub buyer_id: BuyerId,
    pub address_id: AddressId,
    pub total: Money,
    pub invoice_code: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Attaches the identifier assigned by storage.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            buyer_id: self.buyer_id,
            address_id: self.address_id,
            total: self.total,
            invoice_code: self.invoice_code,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// An order line together with the snapshot it was sold from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetails {
    #[serde(flatten)]
    pub line: OrderLine,
    pub snapshot: ProductSnapshot,
}

/// A complete order as readers see it: header plus every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLineDetails>,
}

impl OrderDetails {
    /// Sums the stored line totals; equals `order.total` for every
    /// order checkout produced.
    pub fn lines_total(&self) -> Option<Money> {
        Money::checked_sum(self.lines.iter().map(|l| l.line.line_total))
    }
}

/// Stages one order line from a frozen snapshot.
///
/// The line total is `snapshot.consumer_price * quantity`, computed in
/// exact minor units.
pub fn stage_line(snapshot: &ProductSnapshot, quantity: u32) -> Result<StagedLine, DomainError> {
    if quantity == 0 {
        return Err(DomainError::InvalidQuantity { quantity });
    }

    let line_total = snapshot
        .consumer_price
        .checked_mul(quantity)
        .ok_or(DomainError::AmountOverflow {
            context: "line total",
        })?;

    Ok(StagedLine {
        snapshot_id: snapshot.id,
        product_id: snapshot.product_id,
        store_id: snapshot.store_id,
        quantity,
        line_total,
        created_at: snapshot.created_at,
    })
}

/// Builds the order header for a set of staged lines.
///
/// The header total is the exact sum of the staged line totals.
pub fn finalize(
    buyer_id: BuyerId,
    address_id: AddressId,
    payment_method: impl Into<String>,
    invoice_code: impl Into<String>,
    lines: &[StagedLine],
    at: DateTime<Utc>,
) -> Result<NewOrder, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::NoLines);
    }

    let total = Money::checked_sum(lines.iter().map(|l| l.line_total)).ok_or(
        DomainError::AmountOverflow {
            context: "order total",
        },
    )?;

    Ok(NewOrder {
        buyer_id,
        address_id,
        total,
        invoice_code: invoice_code.into(),
        payment_method: payment_method.into(),
        created_at: at,
    })
}
