//! Storage collaborators for checkout.
//!
//! - [`UnitOfWork`] opens a [`Session`], the transactional scope one
//!   checkout runs in. Dropping a session without committing rolls it back.
//! - [`LockingStore`] is the inventory ledger capability: lock a product row
//!   for the rest of the session, then write its stock through that lock.
//! - [`AddressDirectory`], [`Catalog`] and [`OrderReader`] are read-only
//!   lookups that run outside any session.
//!
//! Two implementations are provided: [`InMemoryStore`] for tests and
//! local runs, and [`PostgresStore`] backed by sqlx.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod session;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use session::{AddressDirectory, Catalog, LockingStore, OrderReader, Session, UnitOfWork};
