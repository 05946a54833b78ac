//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

use crate::response::Envelope;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The buyer identity header is missing or malformed.
    #[error("{0}")]
    Unauthorized(String),

    /// The request could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(err) => match err {
                CheckoutError::AddressNotOwned { .. } => StatusCode::FORBIDDEN,
                CheckoutError::ProductNotFound(_) | CheckoutError::OrderNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CheckoutError::InsufficientStock { .. } | CheckoutError::InvalidCart(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                CheckoutError::Persistence(_) | CheckoutError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Text shown to the client. Server-side failures do not leak storage
    /// details.
    fn public_message(&self) -> String {
        match self {
            ApiError::Checkout(CheckoutError::LockTimeout(_)) => {
                "product is busy, please retry the checkout".to_string()
            }
            ApiError::Checkout(CheckoutError::Persistence(_)) => {
                "order could not be saved, please retry the checkout".to_string()
            }
            ApiError::Checkout(CheckoutError::Internal(_)) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retryable = matches!(&self, ApiError::Checkout(err) if err.is_retryable());

        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }

        let body = Envelope::error(status, self.public_message(), retryable);
        (status, Json(body)).into_response()
    }
}
