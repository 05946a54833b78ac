use async_trait::async_trait;
use domain::{
    Address, AddressId, BuyerId, NewOrder, NewProductSnapshot, Order, OrderDetails, OrderId,
    OrderLine, Product, ProductId, ProductSnapshot, StagedLine,
};

use crate::Result;

/// Opens units of work.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Begins a new session. Nothing written through it becomes visible to
    /// readers until [`Session::commit`] succeeds.
    async fn begin(&self) -> Result<Box<dyn Session>>;
}

/// Inventory ledger capability: exclusive, session-scoped row locks on
/// products and stock writes through those locks.
#[async_trait]
pub trait LockingStore: Send {
    /// Locks the product row and reads it.
    ///
    /// The lock is held until the session commits, aborts or is dropped.
    /// Blocks while another session holds the row, up to the configured lock
    /// timeout. Locking a row this session already holds returns the row
    /// including this session's own uncommitted writes.
    ///
    /// Returns `None` if the product does not exist.
    async fn lock_and_read(&mut self, product_id: ProductId) -> Result<Option<Product>>;

    /// Persists a new stock count for a row this session has locked.
    ///
    /// Fails with [`StoreError::NotLocked`](crate::StoreError::NotLocked) if
    /// the row was not locked through [`lock_and_read`](Self::lock_and_read).
    async fn write_stock(&mut self, product_id: ProductId, new_stock: u32) -> Result<()>;
}

/// A transactional scope. All writes either commit together or not at all.
#[async_trait]
pub trait Session: LockingStore {
    /// Persists a frozen snapshot and returns it with its identifier.
    async fn insert_snapshot(&mut self, snapshot: NewProductSnapshot) -> Result<ProductSnapshot>;

    /// Persists an order header and returns it with its identifier.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Persists a staged line under an order inserted by this session.
    async fn insert_order_line(&mut self, order_id: OrderId, line: StagedLine)
    -> Result<OrderLine>;

    /// Makes every write of this session durable and visible, then releases
    /// its locks. On error nothing was applied.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of this session and releases its locks.
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Address ownership lookup.
#[async_trait]
pub trait AddressDirectory: Send + Sync {
    /// Returns the address only if it exists and belongs to `buyer_id`.
    async fn find_address(
        &self,
        address_id: AddressId,
        buyer_id: BuyerId,
    ) -> Result<Option<Address>>;
}

/// Committed product reads.
///
/// Checkout never reads products through this trait; it locks them through
/// [`LockingStore::lock_and_read`]. `Catalog` serves verification reads of
/// committed stock, such as checking a backend after a checkout or rollback.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>>;
}

/// Committed order reads.
#[async_trait]
pub trait OrderReader: Send + Sync {
    /// All orders of a buyer, newest first, with lines and snapshots.
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<OrderDetails>>;

    /// One order with lines and snapshots, if it belongs to `buyer_id`.
    async fn order_for_buyer(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetails>>;
}
