//! Domain error types.

use common::BookId;
use thiserror::Error;

/// Errors raised while validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The string does not name a known order status.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Page or page size is out of range.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// An order line asks for zero copies of a book.
    #[error("Invalid quantity for book {0}: must be at least 1")]
    ZeroQuantity(BookId),

    /// A money computation exceeded the representable range.
    #[error("Amount overflow")]
    AmountOverflow,
}
