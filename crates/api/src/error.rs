//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,
    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Checkout or order query error.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(err) => checkout_status(err),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::InvalidQuantity(_)
        | CheckoutError::BookNotFound(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InsufficientBalance { .. }
        | CheckoutError::AmountOverflow
        | CheckoutError::InvalidStatus(_)
        | CheckoutError::InvalidPagination(_) => StatusCode::BAD_REQUEST,
        CheckoutError::AccountNotFound(_) | CheckoutError::OrderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CheckoutError::Forbidden => StatusCode::FORBIDDEN,
        CheckoutError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CheckoutError::ConcurrentStockExhaustion { .. }
        | CheckoutError::Interrupted(_)
        | CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
        }

        let mut body = json!({ "error": self.to_string() });
        match &self {
            ApiError::Checkout(CheckoutError::InsufficientStock { shortages }) => {
                body["shortages"] = json!(shortages);
            }
            ApiError::Checkout(CheckoutError::InsufficientBalance {
                required,
                available,
            }) => {
                body["required"] = json!(required);
                body["available"] = json!(available);
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use common::BookId;
    use domain::{Money, Shortage};

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_shortages_are_listed_in_body() {
        let book_id = BookId::new();
        let err = ApiError::from(CheckoutError::InsufficientStock {
            shortages: vec![Shortage {
                book_id,
                title: "Dune".to_string(),
                available: 1,
                requested: 2,
            }],
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["shortages"][0]["title"], "Dune");
        assert_eq!(json["shortages"][0]["available"], 1);
        assert_eq!(json["shortages"][0]["book_id"], book_id.to_string());
    }

    #[tokio::test]
    async fn test_balance_failure_carries_amounts() {
        let err = ApiError::from(CheckoutError::InsufficientBalance {
            required: Money::from_cents(2_000),
            available: Money::from_cents(1_500),
        });

        let json = body_json(err.into_response()).await;
        assert_eq!(json["required"], 2_000);
        assert_eq!(json["available"], 1_500);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(CheckoutError::EmptyCart).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CheckoutError::AccountNotFound(common::UserId::new())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CheckoutError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CheckoutError::ConcurrentStockExhaustion {
                book_id: BookId::new()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(CheckoutError::Timeout {
                step: "decrement_stock"
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(CheckoutError::InvalidQuantity(BookId::new())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
