//! Invoice code generation.

use domain::BuyerId;
use uuid::Uuid;

/// Number of hex digits kept from the random identifier.
pub const SUFFIX_LEN: usize = 16;

/// Produces human-readable invoice codes.
///
/// Codes must be unique across all orders. Storage enforces uniqueness as
/// well, so a collision surfaces as a retryable persistence failure.
pub trait InvoiceCodeGenerator: Send + Sync {
    fn generate(&self, buyer_id: BuyerId) -> String;
}

/// `INV/{buyer_id}/{suffix}` where the suffix is the first
/// [`SUFFIX_LEN`] uppercase hex digits of a random v4 UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInvoiceCodes;

impl InvoiceCodeGenerator for RandomInvoiceCodes {
    fn generate(&self, buyer_id: BuyerId) -> String {
        let mut suffix = Uuid::new_v4().simple().to_string();
        suffix.truncate(SUFFIX_LEN);
        suffix.make_ascii_uppercase();
        format!("INV/{buyer_id}/{suffix}")
    }
}
