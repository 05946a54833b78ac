//! Checkout orchestrator.
//!
//! [`CheckoutService::create_order`] runs one checkout inside one unit of
//! work. Every exit path other than a successful commit ends the session:
//! errors call [`Session::abort`] explicitly, and a panic drops the session,
//! which rolls it back.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::Utc;
use domain::{
    AddressId, BuyerId, CartLine, OrderDetails, OrderLineDetails, ProductSnapshot, StagedLine,
    finalize, freeze, stage_line,
};
use futures_util::FutureExt;
use store::{AddressDirectory, LockingStore, Session, UnitOfWork};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::invoice::{InvoiceCodeGenerator, RandomInvoiceCodes};
use crate::state::CheckoutState;

/// A buyer's request to turn a cart into an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer_id: BuyerId,
    pub address_id: AddressId,
    pub payment_method: String,
    pub lines: Vec<CartLine>,
}

impl CheckoutRequest {
    pub fn new(
        buyer_id: BuyerId,
        address_id: AddressId,
        payment_method: impl Into<String>,
        lines: Vec<CartLine>,
    ) -> Self {
        Self {
            buyer_id,
            address_id,
            payment_method: payment_method.into(),
            lines,
        }
    }

    /// Checks the shape of the cart before any storage is touched.
    fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(CheckoutError::InvalidCart("cart is empty".to_string()));
        }
        if self.payment_method.trim().is_empty() {
            return Err(CheckoutError::InvalidCart(
                "payment method is required".to_string(),
            ));
        }
        for line in &self.lines {
            line.validate()?;
        }
        Ok(())
    }
}

/// Tracks the state machine of a single checkout.
#[derive(Debug, Default)]
struct Progress {
    state: CheckoutState,
}

impl Progress {
    fn advance(&mut self, next: CheckoutState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal checkout transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(from = %self.state, to = %next, "checkout transition");
        self.state = next;
    }

    /// Moves to `Aborted` and returns the state the checkout failed in.
    fn abort(&mut self) -> CheckoutState {
        let failed_in = self.state;
        if !failed_in.is_terminal() {
            self.advance(CheckoutState::Aborted);
        }
        failed_in
    }
}

/// Times a checkout and records it as cancelled if its future is dropped
/// before [`InFlight::finish`] runs.
struct InFlight {
    start: Instant,
    finished: bool,
}

impl InFlight {
    fn start() -> Self {
        Self {
            start: Instant::now(),
            finished: false,
        }
    }

    /// Records the duration and returns it in seconds.
    fn finish(mut self) -> f64 {
        self.finished = true;
        self.record()
    }

    fn record(&self) -> f64 {
        let duration = self.start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        duration
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let duration = self.record();
        metrics::counter!("checkout_aborted_total", "reason" => CANCELLED).increment(1);
        tracing::warn!(reason = CANCELLED, duration, "checkout cancelled before completion");
    }
}

/// Abort reason recorded when the caller drops a checkout mid-flight.
const CANCELLED: &str = "cancelled";

/// Converts carts into orders.
///
/// Generic over the storage collaborators so the same orchestrator runs
/// against the in-memory store and PostgreSQL.
pub struct CheckoutService<S, G = RandomInvoiceCodes> {
    store: S,
    invoices: G,
    config: CheckoutConfig,
}

impl<S> CheckoutService<S, RandomInvoiceCodes>
where
    S: UnitOfWork + AddressDirectory,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, CheckoutConfig::default())
    }

    pub fn with_config(store: S, config: CheckoutConfig) -> Self {
        Self {
            store,
            invoices: RandomInvoiceCodes,
            config,
        }
    }
}

impl<S, G> CheckoutService<S, G>
where
    S: UnitOfWork + AddressDirectory,
    G: InvoiceCodeGenerator,
{
    /// Replaces the invoice code generator.
    pub fn with_invoice_codes<H: InvoiceCodeGenerator>(self, invoices: H) -> CheckoutService<S, H> {
        CheckoutService {
            store: self.store,
            invoices,
            config: self.config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Converts a cart into a persisted order, all or nothing.
    ///
    /// On success the stock of every product has been decremented, one
    /// snapshot and one order line exist per cart line, and the order total
    /// equals the sum of the line totals. On any error none of that is
    /// visible to other sessions.
    #[tracing::instrument(
        skip(self, request),
        fields(
            buyer_id = %request.buyer_id,
            address_id = %request.address_id,
            lines = request.lines.len()
        )
    )]
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<OrderDetails> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let in_flight = InFlight::start();
        let mut progress = Progress::default();

        let result = AssertUnwindSafe(self.run(&request, &mut progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(CheckoutError::Internal(panic_message(panic))));

        let duration = in_flight.finish();

        match &result {
            Ok(details) => {
                metrics::counter!("checkout_committed_total").increment(1);
                tracing::info!(
                    order_id = %details.order.id,
                    invoice_code = %details.order.invoice_code,
                    total = %details.order.total,
                    duration,
                    "checkout committed"
                );
            }
            Err(err) => {
                let failed_in = progress.abort();
                metrics::counter!("checkout_aborted_total", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(
                    reason = err.reason(),
                    state = %failed_in,
                    error = %err,
                    duration,
                    "checkout aborted"
                );
            }
        }

        result
    }

    async fn run(&self, request: &CheckoutRequest, progress: &mut Progress) -> Result<OrderDetails> {
        request.validate()?;
        self.store
            .find_address(request.address_id, request.buyer_id)
            .await?
            .ok_or(CheckoutError::AddressNotOwned {
                address_id: request.address_id,
                buyer_id: request.buyer_id,
            })?;

        progress.advance(CheckoutState::Locking);
        let mut session = self.store.begin().await?;

        let details = match self.fill(session.as_mut(), request, progress).await {
            Ok(details) => details,
            Err(err) => {
                if let Err(abort_err) = session.abort().await {
                    tracing::error!(error = %abort_err, "failed to abort checkout session");
                }
                return Err(err);
            }
        };

        session.commit().await?;
        progress.advance(CheckoutState::Committed);
        Ok(details)
    }

    /// Reserves stock and writes the order through `session`.
    async fn fill(
        &self,
        session: &mut dyn Session,
        request: &CheckoutRequest,
        progress: &mut Progress,
    ) -> Result<OrderDetails> {
        let at = Utc::now();
        let mut staged: Vec<Option<(StagedLine, ProductSnapshot)>> = vec![None; request.lines.len()];

        for (step, index) in self
            .config
            .lock_order
            .sequence(&request.lines)
            .into_iter()
            .enumerate()
        {
            if step > 0 {
                progress.advance(CheckoutState::Locking);
            }
            let cart_line = request.lines[index];

            let product = session
                .lock_and_read(cart_line.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(cart_line.product_id))?;

            progress.advance(CheckoutState::Reserving);
            if !product.has_stock_for(cart_line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    requested: cart_line.quantity,
                    available: product.stock,
                });
            }
            session
                .write_stock(product.id, product.stock - cart_line.quantity)
                .await?;

            progress.advance(CheckoutState::Assembling);
            let snapshot = session.insert_snapshot(freeze(&product, at)).await?;
            let line = stage_line(&snapshot, cart_line.quantity)?;
            staged[index] = Some((line, snapshot));
        }

        progress.advance(CheckoutState::Finalizing);
        let (lines, snapshots): (Vec<StagedLine>, Vec<ProductSnapshot>) =
            staged.into_iter().flatten().unzip();

        let invoice_code = self.invoices.generate(request.buyer_id);
        let new_order = finalize(
            request.buyer_id,
            request.address_id,
            request.payment_method.trim(),
            invoice_code,
            &lines,
            at,
        )?;
        let order = session.insert_order(new_order).await?;

        let mut details = Vec::with_capacity(lines.len());
        for (line, snapshot) in lines.into_iter().zip(snapshots) {
            let line = session.insert_order_line(order.id, line).await?;
            details.push(OrderLineDetails { line, snapshot });
        }

        Ok(OrderDetails {
            order,
            lines: details,
        })
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "checkout panicked".to_string()
    }
}
