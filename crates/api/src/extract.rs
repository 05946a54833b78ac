//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::BuyerId;

use crate::error::ApiError;

/// Header carrying the already-authenticated buyer identifier.
pub const BUYER_HEADER: &str = "x-buyer-id";

/// The buyer making the request, taken from [`BUYER_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct Buyer(pub BuyerId);

impl<S: Send + Sync> FromRequestParts<S> for Buyer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(BUYER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {BUYER_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.parse::<BuyerId>().ok())
            .filter(|id| id.as_i64() > 0)
            .map(Buyer)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {BUYER_HEADER} header")))
    }
}
