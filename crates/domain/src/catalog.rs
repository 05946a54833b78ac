//! Live catalog and address records read by checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AddressId, BuyerId, CategoryId, Money, ProductId, StoreId};

/// A product offered by a store.
///
/// `stock` is the only field checkout mutates, and only through a row it
/// holds locked inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub reseller_price: Money,
    pub consumer_price: Money,
    pub stock: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if `quantity` units can be taken from current stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// A buyer-owned shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub buyer_id: BuyerId,
    pub title: String,
    pub recipient_name: String,
    pub phone: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Returns true if this address belongs to `buyer_id`.
    pub fn is_owned_by(&self, buyer_id: BuyerId) -> bool {
        self.buyer_id == buyer_id
    }
}

/// Field values for a product row about to be inserted by catalog tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub reseller_price: Money,
    pub consumer_price: Money,
    pub stock: u32,
    pub description: String,
}

impl NewProduct {
    /// Creates a product with derived slug and matching reseller price.
    pub fn new(
        store_id: impl Into<StoreId>,
        name: impl Into<String>,
        consumer_price: Money,
        stock: u32,
    ) -> Self {
        let name = name.into();
        Self {
            store_id: store_id.into(),
            category_id: CategoryId::new(1),
            slug: slugify(&name),
            name,
            reseller_price: consumer_price,
            consumer_price,
            stock,
            description: String::new(),
        }
    }

    /// Attaches the identifier assigned by storage.
    pub fn into_product(self, id: ProductId, at: DateTime<Utc>) -> Product {
        Product {
            id,
            store_id: self.store_id,
            category_id: self.category_id,
            name: self.name,
            slug: self.slug,
            reseller_price: self.reseller_price,
            consumer_price: self.consumer_price,
            stock: self.stock,
            description: self.description,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Field values for an address row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub buyer_id: BuyerId,
    pub title: String,
    pub recipient_name: String,
    pub phone: String,
    pub detail: String,
}

impl NewAddress {
    /// Creates an address with the given label for `buyer_id`.
    pub fn new(buyer_id: impl Into<BuyerId>, title: impl Into<String>) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            title: title.into(),
            recipient_name: String::new(),
            phone: String::new(),
            detail: String::new(),
        }
    }

    /// Attaches the identifier assigned by storage.
    pub fn into_address(self, id: AddressId, at: DateTime<Utc>) -> Address {
        Address {
            id,
            buyer_id: self.buyer_id,
            title: self.title,
            recipient_name: self.recipient_name,
            phone: self.phone,
            detail: self.detail,
            created_at: at,
            updated_at: at,
        }
    }
}

fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
