use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::{DomainError, Money};

/// A purchased line with the unit price captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub book_id: BookId,
    pub quantity: u32,
    /// Unit price when the order was placed, independent of the live catalog price.
    pub price: Money,
}

impl OrderItem {
    pub fn new(book_id: BookId, quantity: u32, price: Money) -> Self {
        Self {
            book_id,
            quantity,
            price,
        }
    }

    /// Returns `price * quantity`.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow)
    }
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
}

impl OrderDraft {
    /// Builds a draft, totalling the items. Every item must have a positive quantity.
    pub fn new(user_id: UserId, items: Vec<OrderItem>) -> Result<Self, DomainError> {
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::ZeroQuantity(item.book_id));
        }
        let total_price = items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
                .ok_or(DomainError::AmountOverflow)
        })?;

        Ok(Self {
            user_id,
            items,
            total_price,
        })
    }
}

/// A finalized order. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a draft as a new pending order.
    pub fn from_draft(draft: OrderDraft) -> Self {
        Self {
            id: OrderId::new(),
            user_id: draft.user_id,
            items: draft.items,
            total_price: draft.total_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the order belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
