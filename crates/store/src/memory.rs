use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Address, AddressId, BuyerId, NewAddress, NewOrder, NewProduct, NewProductSnapshot, Order,
    OrderDetails, OrderId, OrderLine, OrderLineDetails, OrderLineId, Product, ProductId,
    ProductSnapshot, SnapshotId, StagedLine,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Result, StoreConfig, StoreError,
    session::{AddressDirectory, Catalog, LockingStore, OrderReader, Session, UnitOfWork},
};

/// Committed rows.
#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    addresses: HashMap<AddressId, Address>,
    snapshots: HashMap<SnapshotId, ProductSnapshot>,
    orders: BTreeMap<OrderId, Order>,
    lines: Vec<OrderLine>,
    invoice_codes: HashSet<String>,
}

/// Identifier sequences. Like database sequences, values handed to a
/// session that later aborts are never reused.
#[derive(Debug, Default)]
struct Sequences {
    product: AtomicI64,
    address: AtomicI64,
    snapshot: AtomicI64,
    order: AtomicI64,
    line: AtomicI64,
}

impl Sequences {
    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_commit: AtomicBool,
    fail_on_order_line: AtomicBool,
}

/// In-memory checkout store for testing and local runs.
///
/// Each product has its own async mutex standing in for a database row
/// lock. A session keeps the owned guard for every row it locked, buffers
/// its writes, and applies them to the committed tables in one step on
/// commit. Dropping a session releases its guards and discards its writes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    row_locks: Arc<StdMutex<HashMap<ProductId, Arc<Mutex<()>>>>>,
    sequences: Arc<Sequences>,
    faults: Arc<Faults>,
    config: StoreConfig,
}

impl InMemoryStore {
    /// Creates a new empty store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store with the given settings.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Inserts a committed product row.
    pub async fn insert_product(&self, product: NewProduct) -> Product {
        let id = ProductId::new(Sequences::next(&self.sequences.product));
        let product = product.into_product(id, Utc::now());
        self.tables
            .write()
            .await
            .products
            .insert(id, product.clone());
        product
    }

    /// Inserts a committed address row.
    pub async fn insert_address(&self, address: NewAddress) -> Address {
        let id = AddressId::new(Sequences::next(&self.sequences.address));
        let address = address.into_address(id, Utc::now());
        self.tables
            .write()
            .await
            .addresses
            .insert(id, address.clone());
        address
    }

    /// Returns the committed stock of a product.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.tables
            .read()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of committed order lines.
    pub async fn order_line_count(&self) -> usize {
        self.tables.read().await.lines.len()
    }

    /// Returns the number of committed snapshots.
    pub async fn snapshot_count(&self) -> usize {
        self.tables.read().await.snapshots.len()
    }

    /// Configures every commit to fail until reset.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Configures order line inserts to fail until reset.
    pub fn set_fail_on_order_line(&self, fail: bool) {
        self.faults.fail_on_order_line.store(fail, Ordering::SeqCst);
    }

    fn row_lock(&self, product_id: ProductId) -> Arc<Mutex<()>> {
        let mut locks = self
            .row_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(product_id).or_default().clone()
    }

    fn details_for(tables: &Tables, order: &Order) -> Result<OrderDetails> {
        let lines = tables
            .lines
            .iter()
            .filter(|l| l.order_id == order.id)
            .map(|line| {
                let snapshot = tables.snapshots.get(&line.snapshot_id).cloned().ok_or_else(|| {
                    StoreError::CorruptRow {
                        table: "order_line",
                        reason: format!("missing snapshot {}", line.snapshot_id),
                    }
                })?;
                Ok(OrderLineDetails {
                    line: line.clone(),
                    snapshot,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderDetails {
            order: order.clone(),
            lines,
        })
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(InMemorySession {
            store: self.clone(),
            held: HashMap::new(),
            rows: HashMap::new(),
            stock_writes: HashSet::new(),
            snapshots: Vec::new(),
            orders: Vec::new(),
            lines: Vec::new(),
        }))
    }
}

#[async_trait]
impl AddressDirectory for InMemoryStore {
    async fn find_address(
        &self,
        address_id: AddressId,
        buyer_id: BuyerId,
    ) -> Result<Option<Address>> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .get(&address_id)
            .filter(|a| a.is_owned_by(buyer_id))
            .cloned())
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&product_id).cloned())
    }
}

#[async_trait]
impl OrderReader for InMemoryStore {
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<OrderDetails>> {
        let tables = self.tables.read().await;
        tables
            .orders
            .values()
            .rev()
            .filter(|o| o.buyer_id == buyer_id)
            .map(|o| Self::details_for(&tables, o))
            .collect()
    }

    async fn order_for_buyer(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetails>> {
        let tables = self.tables.read().await;
        match tables.orders.get(&order_id) {
            Some(order) if order.buyer_id == buyer_id => {
                Ok(Some(Self::details_for(&tables, order)?))
            }
            _ => Ok(None),
        }
    }
}

/// A unit of work over [`InMemoryStore`].
pub struct InMemorySession {
    store: InMemoryStore,
    held: HashMap<ProductId, OwnedMutexGuard<()>>,
    rows: HashMap<ProductId, Product>,
    stock_writes: HashSet<ProductId>,
    snapshots: Vec<ProductSnapshot>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
}

#[async_trait]
impl LockingStore for InMemorySession {
    #[tracing::instrument(skip(self))]
    async fn lock_and_read(&mut self, product_id: ProductId) -> Result<Option<Product>> {
        if let Some(row) = self.rows.get(&product_id) {
            return Ok(Some(row.clone()));
        }

        if !self
            .store
            .tables
            .read()
            .await
            .products
            .contains_key(&product_id)
        {
            return Ok(None);
        }

        let lock = self.store.row_lock(product_id);
        let wait = self.store.config.effective_lock_timeout();
        let guard = tokio::time::timeout(wait, lock.lock_owned())
            .await
            .map_err(|_| StoreError::lock_timeout(format!("product {product_id}")))?;

        // Re-read after acquiring: the previous holder may have committed.
        let row = self
            .store
            .tables
            .read()
            .await
            .products
            .get(&product_id)
            .cloned();

        match row {
            Some(row) => {
                self.held.insert(product_id, guard);
                self.rows.insert(product_id, row.clone());
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    async fn write_stock(&mut self, product_id: ProductId, new_stock: u32) -> Result<()> {
        let row = self
            .rows
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_locked(format!("product {product_id}")))?;
        row.stock = new_stock;
        row.updated_at = Utc::now();
        self.stock_writes.insert(product_id);
        Ok(())
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn insert_snapshot(&mut self, snapshot: NewProductSnapshot) -> Result<ProductSnapshot> {
        let id = SnapshotId::new(Sequences::next(&self.store.sequences.snapshot));
        let snapshot = snapshot.into_snapshot(id);
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let duplicate = self
            .orders
            .iter()
            .any(|o| o.invoice_code == order.invoice_code)
            || self
                .store
                .tables
                .read()
                .await
                .invoice_codes
                .contains(&order.invoice_code);
        if duplicate {
            return Err(StoreError::UniqueViolation {
                constraint: "orders_invoice_code_key".to_string(),
            });
        }

        let id = OrderId::new(Sequences::next(&self.store.sequences.order));
        let order = order.into_order(id);
        self.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: StagedLine,
    ) -> Result<OrderLine> {
        if self.store.faults.fail_on_order_line.load(Ordering::SeqCst) {
            return Err(StoreError::Constraint(
                "injected order line failure".to_string(),
            ));
        }
        if !self.orders.iter().any(|o| o.id == order_id) {
            return Err(StoreError::Constraint(format!(
                "order_line references unknown order {order_id}"
            )));
        }
        if !self.snapshots.iter().any(|s| s.id == line.snapshot_id) {
            return Err(StoreError::Constraint(format!(
                "order_line references unknown snapshot {}",
                line.snapshot_id
            )));
        }

        let id = OrderLineId::new(Sequences::next(&self.store.sequences.line));
        let line = line.into_line(id, order_id);
        self.lines.push(line.clone());
        Ok(line)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let session = *self;
        if session.store.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        {
            let mut tables = session.store.tables.write().await;

            if let Some(order) = session
                .orders
                .iter()
                .find(|o| tables.invoice_codes.contains(&o.invoice_code))
            {
                return Err(StoreError::UniqueViolation {
                    constraint: format!("orders_invoice_code_key ({})", order.invoice_code),
                });
            }

            for product_id in &session.stock_writes {
                if let Some(row) = session.rows.get(product_id) {
                    tables.products.insert(*product_id, row.clone());
                }
            }
            for snapshot in session.snapshots {
                tables.snapshots.insert(snapshot.id, snapshot);
            }
            for order in session.orders {
                tables.invoice_codes.insert(order.invoice_code.clone());
                tables.orders.insert(order.id, order);
            }
            tables.lines.extend(session.lines);
        }

        // Row guards drop here, after the writes are visible.
        drop(session.held);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
