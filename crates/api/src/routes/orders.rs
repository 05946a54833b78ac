//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CheckoutRequest, CheckoutService, OrderHistory};
use domain::{AddressId, CartLine, OrderDetails, OrderId};
use serde::Deserialize;

use crate::CheckoutStore;
use crate::error::ApiError;
use crate::extract::Buyer;
use crate::response::{Envelope, respond};

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub checkout: CheckoutService<S>,
    pub history: OrderHistory<S>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub address_id: AddressId,
    pub payment_method: String,
    pub items: Vec<CartLine>,
}

type Reply<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

/// POST /orders: check out the submitted cart.
#[tracing::instrument(skip_all, fields(buyer_id = %buyer))]
pub async fn create<S: CheckoutStore>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer): Buyer,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Reply<OrderDetails> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let details = state
        .checkout
        .create_order(CheckoutRequest::new(
            buyer,
            req.address_id,
            req.payment_method,
            req.items,
        ))
        .await?;

    Ok(respond(StatusCode::CREATED, "order created", details))
}

/// GET /orders: the buyer's orders, newest first.
#[tracing::instrument(skip_all, fields(buyer_id = %buyer))]
pub async fn list<S: CheckoutStore>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer): Buyer,
) -> Reply<Vec<OrderDetails>> {
    let orders = state.history.list_orders(buyer).await?;
    Ok(respond(StatusCode::OK, "orders retrieved", orders))
}

/// GET /orders/{id}: one of the buyer's orders with its lines.
#[tracing::instrument(skip_all, fields(buyer_id = %buyer))]
pub async fn get<S: CheckoutStore>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer): Buyer,
    id: Result<Path<OrderId>, PathRejection>,
) -> Reply<OrderDetails> {
    let Path(order_id) = id.map_err(|_| ApiError::BadRequest("invalid order id".to_string()))?;
    let details = state.history.get_order(buyer, order_id).await?;
    Ok(respond(StatusCode::OK, "order retrieved", details))
}
