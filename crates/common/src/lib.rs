//! Identifier types shared by every crate of the checkout service.

pub mod types;

pub use types::{
    AddressId, BuyerId, CategoryId, OrderId, OrderLineId, ProductId, SnapshotId, StoreId,
};
