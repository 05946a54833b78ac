//! Response envelope shared by every order endpoint.
//!
//! ```json
//! { "meta": { "status": "success", "code": 201, "message": "..." }, "data": { ... } }
//! ```

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub status: &'static str,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            meta: Meta {
                status: "success",
                code: code.as_u16(),
                message: message.into(),
                retryable: false,
            },
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn error(code: StatusCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            meta: Meta {
                status: "error",
                code: code.as_u16(),
                message: message.into(),
                retryable,
            },
            data: None,
        }
    }
}

/// Pairs an envelope with its HTTP status.
pub fn respond<T: Serialize>(
    code: StatusCode,
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<Envelope<T>>) {
    (code, Json(Envelope::success(code, message, data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let json = serde_json::to_value(Envelope::success(StatusCode::CREATED, "created", 5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "meta": { "status": "success", "code": 201, "message": "created" },
                "data": 5
            })
        );
    }

    #[test]
    fn test_error_shape_has_null_data() {
        let json =
            serde_json::to_value(Envelope::error(StatusCode::SERVICE_UNAVAILABLE, "busy", true))
                .unwrap();
        assert_eq!(json["meta"]["status"], "error");
        assert_eq!(json["meta"]["code"], 503);
        assert_eq!(json["meta"]["retryable"], true);
        assert!(json["data"].is_null());
    }
}
