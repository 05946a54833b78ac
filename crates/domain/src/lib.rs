//! Domain layer for the checkout service.
//!
//! This crate provides the entities checkout reads and writes:
//! - `Product` and `Address`, the live records checkout consults
//! - `ProductSnapshot`, the frozen copy of a product taken at sale time
//! - `Order` and `OrderLine`, created together by a successful checkout
//! - `Money`, exact fixed-point currency
//!
//! It also hosts the two pure checkout steps: freezing a snapshot
//! ([`snapshot::freeze`]) and assembling order lines and headers
//! ([`order::stage_line`], [`order::finalize`]).

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod snapshot;

pub use cart::CartLine;
pub use catalog::{Address, NewAddress, NewProduct, Product};
pub use common::{
    AddressId, BuyerId, CategoryId, OrderId, OrderLineId, ProductId, SnapshotId, StoreId,
};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    NewOrder, Order, OrderDetails, OrderLine, OrderLineDetails, StagedLine, finalize, stage_line,
};
pub use snapshot::{NewProductSnapshot, ProductSnapshot, freeze};
