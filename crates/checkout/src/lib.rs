//! Checkout: converting a multi-item cart into a durable order.
//!
//! A checkout validates the shipping address, then inside one unit of work
//! locks each product row, checks and decrements stock, freezes a product
//! snapshot and stages an order line. Once every line succeeds it writes the
//! order header (with a fresh invoice code) and its lines, then commits.
//! Any failure, including a panic, aborts the whole unit of work.
//!
//! ```text
//! Validating ──► Locking ──► Reserving ──► Assembling ──┬──► Finalizing ──► Committed
//!                   ▲                                   │
//!                   └────────── next cart line ─────────┘
//!     (any non-terminal state) ──► Aborted
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod invoice;
pub mod orchestrator;
pub mod state;

pub use config::{CheckoutConfig, LockOrder};
pub use error::{CheckoutError, Result};
pub use history::OrderHistory;
pub use invoice::{InvoiceCodeGenerator, RandomInvoiceCodes};
pub use orchestrator::{CheckoutRequest, CheckoutService};
pub use state::CheckoutState;
