use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::Serialize;

use super::{Order, OrderStatus};
use crate::{Account, Book, Money};

/// Display fields of the ordering user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserSummary {
    /// Summary for a user whose account is no longer available.
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
        }
    }
}

impl From<&Account> for UserSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

/// An order item with the book's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemView {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub quantity: u32,
    pub price: Money,
}

/// An order populated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user: UserSummary,
    pub items: Vec<OrderItemView>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    /// Joins an order with its user and books.
    ///
    /// `lookup_book` returns the current catalog record for an item; items
    /// whose book has since been removed keep empty display fields. Prices
    /// always come from the order, never from the catalog.
    pub fn build<'a>(
        order: Order,
        user: UserSummary,
        mut lookup_book: impl FnMut(BookId) -> Option<&'a Book>,
    ) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| {
                let (title, author) = lookup_book(item.book_id)
                    .map(|book| (book.title.clone(), book.author.clone()))
                    .unwrap_or_default();
                OrderItemView {
                    book_id: item.book_id,
                    title,
                    author,
                    quantity: item.quantity,
                    price: item.price,
                }
            })
            .collect();

        Self {
            id: order.id,
            user,
            items,
            total_price: order.total_price,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{OrderDraft, OrderItem};

    #[test]
    fn test_build_uses_order_price_not_catalog_price() {
        let book = Book::new("Dune", "Frank Herbert", Money::from_cents(9999), 4);
        let account = Account::new("Ada", "ada@example.com", Money::zero());
        let draft = OrderDraft::new(
            account.id,
            vec![OrderItem::new(book.id, 2, Money::from_cents(1299))],
        )
        .unwrap();
        let order = Order::from_draft(draft);
        let books: HashMap<BookId, Book> = [(book.id, book.clone())].into();

        let view = OrderView::build(order, UserSummary::from(&account), |id| books.get(&id));

        assert_eq!(view.user.email, "ada@example.com");
        assert_eq!(view.items[0].title, "Dune");
        assert_eq!(view.items[0].price, Money::from_cents(1299));
        assert_eq!(view.total_price, Money::from_cents(2598));
    }

    #[test]
    fn test_build_tolerates_removed_books() {
        let draft = OrderDraft::new(
            UserId::new(),
            vec![OrderItem::new(BookId::new(), 1, Money::from_cents(500))],
        )
        .unwrap();
        let order = Order::from_draft(draft);
        let user = UserSummary::unknown(order.user_id);

        let view = OrderView::build(order, user, |_| None);

        assert_eq!(view.items.len(), 1);
        assert!(view.items[0].title.is_empty());
        assert_eq!(view.items[0].price, Money::from_cents(500));
    }
}
