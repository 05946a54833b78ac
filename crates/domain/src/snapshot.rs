//! Product snapshots frozen at sale time.
//!
//! A snapshot keeps the sale-relevant fields of a product exactly as they
//! were when a checkout sold it, so historical orders keep showing the
//! price and name the buyer paid for even after the live product changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, Money, Product, ProductId, SnapshotId, StoreId};

/// A persisted, immutable product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: SnapshotId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub reseller_price: Money,
    pub consumer_price: Money,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A snapshot that has been frozen but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductSnapshot {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub reseller_price: Money,
    pub consumer_price: Money,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewProductSnapshot {
    /// Attaches the identifier assigned by storage.
    pub fn into_snapshot(self, id: SnapshotId) -> ProductSnapshot {
        ProductSnapshot {
            id,
            product_id: self.product_id,
            store_id: self.store_id,
            category_id: self.category_id,
            name: self.name,
            slug: self.slug,
            reseller_price: self.reseller_price,
            consumer_price: self.consumer_price,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Freezes the sale-relevant fields of a locked product.
///
/// Performs no validation of its own: callers must only freeze a product
/// whose stock has already been checked and decremented for this line
/// inside the same unit of work.
pub fn freeze(product: &Product, at: DateTime<Utc>) -> NewProductSnapshot {
    NewProductSnapshot {
        product_id: product.id,
        store_id: product.store_id,
        category_id: product.category_id,
        name: product.name.clone(),
        slug: product.slug.clone(),
        reseller_price: product.reseller_price,
        consumer_price: product.consumer_price,
        description: product.description.clone(),
        created_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(10),
            store_id: StoreId::new(2),
            category_id: CategoryId::new(3),
            name: "Kopi Gayo".to_string(),
            slug: "kopi-gayo".to_string(),
            reseller_price: Money::from_minor_units(40_000),
            consumer_price: Money::from_minor_units(55_000),
            stock: 8,
            description: "Arabica beans".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_freeze_copies_sale_fields() {
        let product = product();
        let at = Utc::now();
        let frozen = freeze(&product, at);

        assert_eq!(frozen.product_id, product.id);
        assert_eq!(frozen.store_id, product.store_id);
        assert_eq!(frozen.category_id, product.category_id);
        assert_eq!(frozen.name, "Kopi Gayo");
        assert_eq!(frozen.slug, "kopi-gayo");
        assert_eq!(frozen.reseller_price, product.reseller_price);
        assert_eq!(frozen.consumer_price, product.consumer_price);
        assert_eq!(frozen.description, product.description);
        assert_eq!(frozen.created_at, at);
    }

    #[test]
    fn test_snapshot_is_detached_from_live_product() {
        let mut product = product();
        let snapshot = freeze(&product, Utc::now()).into_snapshot(SnapshotId::new(1));

        product.name = "Kopi Gayo Premium".to_string();
        product.consumer_price = Money::from_minor_units(99_000);

        assert_eq!(snapshot.name, "Kopi Gayo");
        assert_eq!(snapshot.consumer_price, Money::from_minor_units(55_000));
        assert_eq!(snapshot.created_at, snapshot.updated_at);
    }
}
