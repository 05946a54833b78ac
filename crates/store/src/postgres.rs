use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Address, AddressId, BuyerId, CategoryId, Money, NewOrder, NewProductSnapshot, Order,
    OrderDetails, OrderId, OrderLine, OrderLineDetails, OrderLineId, Product, ProductId,
    ProductSnapshot, SnapshotId, StagedLine, StoreId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Result, StoreConfig, StoreError,
    session::{AddressDirectory, Catalog, LockingStore, OrderReader, Session, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, store_id, category_id, name, slug, reseller_price, \
     consumer_price, stock, description, created_at, updated_at";

const ORDER_COLUMNS: &str =
    "id, buyer_id, address_id, total, invoice_code, payment_method, created_at, updated_at";

/// PostgreSQL-backed checkout store.
///
/// Product locks are `SELECT ... FOR UPDATE` row locks held by the session's
/// transaction; the configured lock timeout is applied per session with
/// `SET LOCAL lock_timeout`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store with default settings.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, StoreConfig::default())
    }

    /// Creates a new PostgreSQL store with the given settings.
    pub fn with_config(pool: PgPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn lines_for_orders(&self, order_ids: &[i64]) -> Result<Vec<(OrderId, OrderLineDetails)>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.order_id, l.snapshot_id, l.store_id, l.quantity, l.line_total,
                   l.created_at, l.updated_at,
                   s.product_id, s.store_id AS snapshot_store_id, s.category_id, s.name, s.slug,
                   s.reseller_price, s.consumer_price, s.description,
                   s.created_at AS snapshot_created_at, s.updated_at AS snapshot_updated_at
            FROM order_line l
            JOIN product_snapshot s ON s.id = l.snapshot_id
            WHERE l.order_id = ANY($1)
            ORDER BY l.id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let line = row_to_order_line(row)?;
                let snapshot = ProductSnapshot {
                    id: line.snapshot_id,
                    product_id: ProductId::new(row.try_get("product_id")?),
                    store_id: StoreId::new(row.try_get("snapshot_store_id")?),
                    category_id: CategoryId::new(row.try_get("category_id")?),
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                    reseller_price: parse_price(row, "reseller_price", "product_snapshot")?,
                    consumer_price: parse_price(row, "consumer_price", "product_snapshot")?,
                    description: row.try_get("description")?,
                    created_at: row.try_get("snapshot_created_at")?,
                    updated_at: row.try_get("snapshot_updated_at")?,
                };
                Ok((line.order_id, OrderLineDetails { line, snapshot }))
            })
            .collect()
    }

    async fn attach_lines(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let mut by_order: HashMap<OrderId, Vec<OrderLineDetails>> = HashMap::new();
        for (order_id, line) in self.lines_for_orders(&ids).await? {
            by_order.entry(order_id).or_default().push(line);
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails {
                lines: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for PostgresStore {
    #[tracing::instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn Session>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(self.config.lock_timeout_setting())
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresSession {
            tx,
            locked: HashSet::new(),
        }))
    }
}

#[async_trait]
impl AddressDirectory for PostgresStore {
    async fn find_address(
        &self,
        address_id: AddressId,
        buyer_id: BuyerId,
    ) -> Result<Option<Address>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, buyer_id, title, recipient_name, phone, detail, created_at, updated_at
            FROM address
            WHERE id = $1 AND buyer_id = $2
            "#,
        )
        .bind(address_id.as_i64())
        .bind(buyer_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Address {
                id: AddressId::new(row.try_get("id")?),
                buyer_id: BuyerId::new(row.try_get("buyer_id")?),
                title: row.try_get("title")?,
                recipient_name: row.try_get("recipient_name")?,
                phone: row.try_get("phone")?,
                detail: row.try_get("detail")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"))
                .bind(product_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(row_to_product).transpose()
    }
}

#[async_trait]
impl OrderReader for PostgresStore {
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<OrderDetails>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(buyer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_lines(orders).await
    }

    async fn order_for_buyer(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetails>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND buyer_id = $2"
        ))
        .bind(order_id.as_i64())
        .bind(buyer_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let order = row_to_order(&row)?;
                Ok(self.attach_lines(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }
}

/// A unit of work over one PostgreSQL transaction.
///
/// Dropping it without commit returns the connection to the pool with the
/// transaction rolled back.
pub struct PostgresSession {
    tx: Transaction<'static, Postgres>,
    locked: HashSet<ProductId>,
}

#[async_trait]
impl LockingStore for PostgresSession {
    #[tracing::instrument(skip(self))]
    async fn lock_and_read(&mut self, product_id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1 FOR UPDATE"
        ))
        .bind(product_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => {
                self.locked.insert(product_id);
                Ok(Some(row_to_product(&row)?))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn write_stock(&mut self, product_id: ProductId, new_stock: u32) -> Result<()> {
        if !self.locked.contains(&product_id) {
            return Err(StoreError::not_locked(format!("product {product_id}")));
        }

        let stock = i32::try_from(new_stock).map_err(|_| {
            StoreError::Constraint(format!("stock {new_stock} exceeds column range"))
        })?;

        sqlx::query("UPDATE product SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_i64())
            .bind(stock)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn insert_snapshot(&mut self, snapshot: NewProductSnapshot) -> Result<ProductSnapshot> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO product_snapshot (product_id, store_id, category_id, name, slug,
                reseller_price, consumer_price, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            "#,
        )
        .bind(snapshot.product_id.as_i64())
        .bind(snapshot.store_id.as_i64())
        .bind(snapshot.category_id.as_i64())
        .bind(&snapshot.name)
        .bind(&snapshot.slug)
        .bind(snapshot.reseller_price.to_decimal_string())
        .bind(snapshot.consumer_price.to_decimal_string())
        .bind(&snapshot.description)
        .bind(snapshot.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(snapshot.into_snapshot(SnapshotId::new(id)))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (buyer_id, address_id, total, invoice_code, payment_method,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(order.buyer_id.as_i64())
        .bind(order.address_id.as_i64())
        .bind(order.total.minor_units())
        .bind(&order.invoice_code)
        .bind(&order.payment_method)
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(order.into_order(OrderId::new(id)))
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: StagedLine,
    ) -> Result<OrderLine> {
        let quantity = i32::try_from(line.quantity).map_err(|_| {
            StoreError::Constraint(format!("quantity {} exceeds column range", line.quantity))
        })?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_line (order_id, snapshot_id, store_id, quantity, line_total,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(order_id.as_i64())
        .bind(line.snapshot_id.as_i64())
        .bind(line.store_id.as_i64())
        .bind(quantity)
        .bind(line.line_total.minor_units())
        .bind(line.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(line.into_line(OrderLineId::new(id), order_id))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let session = *self;
        session.tx.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        let session = *self;
        session.tx.rollback().await?;
        Ok(())
    }
}

fn parse_price(row: &PgRow, column: &str, table: &'static str) -> Result<Money> {
    let text: String = row.try_get(column)?;
    text.parse().map_err(|e: domain::DomainError| StoreError::CorruptRow {
        table,
        reason: format!("{column}: {e}"),
    })
}

fn non_negative(value: i32, column: &str, table: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::CorruptRow {
        table,
        reason: format!("{column} is negative: {value}"),
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        store_id: StoreId::new(row.try_get("store_id")?),
        category_id: CategoryId::new(row.try_get("category_id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        reseller_price: parse_price(row, "reseller_price", "product")?,
        consumer_price: parse_price(row, "consumer_price", "product")?,
        stock: non_negative(row.try_get("stock")?, "stock", "product")?,
        description: row.try_get("description")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        buyer_id: BuyerId::new(row.try_get("buyer_id")?),
        address_id: AddressId::new(row.try_get("address_id")?),
        total: Money::from_minor_units(row.try_get("total")?),
        invoice_code: row.try_get("invoice_code")?,
        payment_method: row.try_get("payment_method")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        id: OrderLineId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        snapshot_id: SnapshotId::new(row.try_get("snapshot_id")?),
        store_id: StoreId::new(row.try_get("store_id")?),
        quantity: non_negative(row.try_get("quantity")?, "quantity", "order_line")?,
        line_total: Money::from_minor_units(row.try_get("line_total")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
