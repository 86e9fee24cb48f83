//! Checkout error types.

use common::{BookId, OrderId, UserId};
use domain::{DomainError, Money, Shortage};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout or order queries.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The checking-out user has no account.
    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    /// A cart line asks for zero copies.
    #[error("Invalid quantity for book {0}: must be at least 1")]
    InvalidQuantity(BookId),

    /// A cart line references a book that no longer exists.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// One or more cart lines exceed available stock.
    #[error("Insufficient stock for {} item(s)", .shortages.len())]
    InsufficientStock { shortages: Vec<Shortage> },

    /// The cart total exceeds the account balance.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Money, available: Money },

    /// Stock ran out between validation and commit because of a concurrent checkout.
    #[error("Stock for book {book_id} was exhausted by a concurrent checkout")]
    ConcurrentStockExhaustion { book_id: BookId },

    /// The cart total cannot be represented.
    #[error("Order total overflows")]
    AmountOverflow,

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order belongs to another user.
    #[error("Order belongs to another user")]
    Forbidden,

    /// The status is not one of the known order statuses.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Page or page size out of range.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// The checkout deadline passed before `step` could start.
    #[error("Checkout timed out before {step}")]
    Timeout { step: &'static str },

    /// The checkout task ended without producing a result.
    #[error("Checkout interrupted: {0}")]
    Interrupted(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::AccountNotFound(_) => "account_not_found",
            CheckoutError::InvalidQuantity(_) => "invalid_quantity",
            CheckoutError::BookNotFound(_) => "book_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::InsufficientBalance { .. } => "insufficient_balance",
            CheckoutError::ConcurrentStockExhaustion { .. } => "concurrent_stock_exhaustion",
            CheckoutError::AmountOverflow => "amount_overflow",
            CheckoutError::OrderNotFound(_) => "order_not_found",
            CheckoutError::Forbidden => "forbidden",
            CheckoutError::InvalidStatus(_) => "invalid_status",
            CheckoutError::InvalidPagination(_) => "invalid_pagination",
            CheckoutError::Timeout { .. } => "timeout",
            CheckoutError::Interrupted(_) => "interrupted",
            CheckoutError::Store(_) => "store",
        }
    }

    /// Returns true for business-rule and input failures, false for system failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            CheckoutError::ConcurrentStockExhaustion { .. }
                | CheckoutError::Timeout { .. }
                | CheckoutError::Interrupted(_)
                | CheckoutError::Store(_)
        )
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidStatus(status) => CheckoutError::InvalidStatus(status),
            DomainError::InvalidPagination(msg) => CheckoutError::InvalidPagination(msg),
            DomainError::ZeroQuantity(book_id) => CheckoutError::InvalidQuantity(book_id),
            DomainError::AmountOverflow => CheckoutError::AmountOverflow,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_matching_variants() {
        let err: CheckoutError = DomainError::InvalidStatus("lost".to_string()).into();
        assert!(matches!(err, CheckoutError::InvalidStatus(ref s) if s == "lost"));

        let err: CheckoutError = DomainError::AmountOverflow.into();
        assert!(matches!(err, CheckoutError::AmountOverflow));
    }

    #[test]
    fn test_commit_failures_are_not_rejections() {
        assert!(CheckoutError::EmptyCart.is_rejection());
        assert!(
            !CheckoutError::ConcurrentStockExhaustion {
                book_id: BookId::new()
            }
            .is_rejection()
        );
        assert!(!CheckoutError::Timeout { step: "debit_balance" }.is_rejection());
        assert!(!CheckoutError::Store(StoreError::Unavailable("down".into())).is_rejection());
    }

    #[test]
    fn test_insufficient_stock_message_counts_lines() {
        let shortage = Shortage {
            book_id: BookId::new(),
            title: "Dune".to_string(),
            available: 0,
            requested: 1,
        };
        let err = CheckoutError::InsufficientStock {
            shortages: vec![shortage.clone(), shortage],
        };
        assert_eq!(err.to_string(), "Insufficient stock for 2 item(s)");
    }
}
