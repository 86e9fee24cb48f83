//! Pending cart lines.

use chrono::{DateTime, Utc};
use common::{BookId, UserId};
use serde::{Deserialize, Serialize};

/// A pending (user, book, quantity) record awaiting checkout.
///
/// There is at most one line per (user, book) pair; adding the same book
/// again replaces the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a cart line stamped with the current time.
    pub fn new(user_id: UserId, book_id: BookId, quantity: u32) -> Self {
        Self {
            user_id,
            book_id,
            quantity,
            added_at: Utc::now(),
        }
    }
}
