//! Read-side order operations plus the administrative status override.

use std::collections::HashMap;

use common::{BookId, OrderId, UserId};
use domain::{Book, Order, OrderStatus, OrderView, PageRequest, Pagination, UserSummary};
use serde::Serialize;
use store::{AccountStore, InventoryStore, OrderFilter, OrderStore};

use crate::error::{CheckoutError, Result};

/// One page of the administrative order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderView>,
    pub pagination: Pagination,
}

/// Order lookups populated with book and user display fields.
#[derive(Debug, Clone)]
pub struct OrderQueryService<O, I, A> {
    orders: O,
    inventory: I,
    accounts: A,
}

impl<O, I, A> OrderQueryService<O, I, A>
where
    O: OrderStore,
    I: InventoryStore,
    A: AccountStore,
{
    pub fn new(orders: O, inventory: I, accounts: A) -> Self {
        Self {
            orders,
            inventory,
            accounts,
        }
    }

    /// All orders of a user, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let orders = self.orders.find_by_user(user_id).await?;
        self.populate(orders).await
    }

    /// A single order owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        if !order.is_owned_by(user_id) {
            return Err(CheckoutError::Forbidden);
        }
        self.populate_one(order).await
    }

    /// Administrative listing of every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage> {
        let total = self.orders.count(filter).await?;
        let orders = self
            .orders
            .find_all(filter, page.skip(), page.limit())
            .await?;

        Ok(OrderPage {
            orders: self.populate(orders).await?,
            pagination: Pagination::compute(page, total),
        })
    }

    /// Overwrites an order's status.
    ///
    /// `status` must be one of the lowercase status names. Any status may
    /// replace any other.
    #[tracing::instrument(skip(self))]
    pub async fn set_order_status(&self, order_id: OrderId, status: &str) -> Result<OrderView> {
        let status: OrderStatus = status.parse()?;
        let order = self
            .orders
            .update_status(order_id, status)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        tracing::info!(%order_id, %status, "order status updated");
        self.populate_one(order).await
    }

    async fn populate_one(&self, order: Order) -> Result<OrderView> {
        let lookups = self.load(std::slice::from_ref(&order)).await?;
        Ok(lookups.view(order))
    }

    async fn populate(&self, orders: Vec<Order>) -> Result<Vec<OrderView>> {
        let lookups = self.load(&orders).await?;
        Ok(orders.into_iter().map(|order| lookups.view(order)).collect())
    }

    /// Loads each referenced user and book once.
    async fn load(&self, orders: &[Order]) -> Result<Lookups> {
        let mut lookups = Lookups::default();

        for order in orders {
            if !lookups.users.contains_key(&order.user_id) {
                let summary = match self.accounts.find_by_id(order.user_id).await? {
                    Some(account) => UserSummary::from(&account),
                    None => UserSummary::unknown(order.user_id),
                };
                lookups.users.insert(order.user_id, summary);
            }
            for item in &order.items {
                if !lookups.books.contains_key(&item.book_id) {
                    let book = self.inventory.find_by_id(item.book_id).await?;
                    lookups.books.insert(item.book_id, book);
                }
            }
        }

        Ok(lookups)
    }
}

#[derive(Debug, Default)]
struct Lookups {
    users: HashMap<UserId, UserSummary>,
    /// `None` for books removed from the catalog.
    books: HashMap<BookId, Option<Book>>,
}

impl Lookups {
    fn view(&self, order: Order) -> OrderView {
        let user = self
            .users
            .get(&order.user_id)
            .cloned()
            .unwrap_or_else(|| UserSummary::unknown(order.user_id));
        OrderView::build(order, user, |book_id| {
            self.books.get(&book_id).and_then(Option::as_ref)
        })
    }
}

#[cfg(test)]
mod tests {
    use domain::{Account, Money, OrderDraft, OrderItem};
    use store::InMemoryStore;

    use super::*;

    type Queries = OrderQueryService<InMemoryStore, InMemoryStore, InMemoryStore>;

    fn queries(store: &InMemoryStore) -> Queries {
        OrderQueryService::new(store.clone(), store.clone(), store.clone())
    }

    async fn place(store: &InMemoryStore, user_id: UserId, book_id: BookId) -> Order {
        let draft = OrderDraft::new(
            user_id,
            vec![OrderItem::new(book_id, 1, Money::from_cents(700))],
        )
        .unwrap();
        store.create(draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_order_of_another_user_is_forbidden() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let order = place(&store, owner, BookId::new()).await;

        let err = queries(&store)
            .get_order(UserId::new(), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Forbidden));

        let err = queries(&store)
            .get_order(owner, OrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_deleted_book_keeps_item_with_empty_fields() {
        let store = InMemoryStore::new();
        let account = Account::new("Ada", "ada@example.com", Money::zero());
        store.insert_account(account.clone()).await;
        let order = place(&store, account.id, BookId::new()).await;

        let view = queries(&store).get_order(account.id, order.id).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert!(view.items[0].title.is_empty());
        assert_eq!(view.items[0].price, Money::from_cents(700));
        assert_eq!(view.user.name, "Ada");
    }

    #[tokio::test]
    async fn test_list_all_orders_pages_and_filters() {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..25 {
            ids.push(place(&store, UserId::new(), BookId::new()).await.id);
        }
        store
            .update_status(ids[0], OrderStatus::Delivered)
            .await
            .unwrap();

        let page = queries(&store)
            .list_all_orders(OrderFilter::new(), PageRequest::new(2, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.orders.len(), 10);
        assert_eq!(page.orders[0].id, ids[14]);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);

        let delivered = queries(&store)
            .list_all_orders(
                OrderFilter::new().status(OrderStatus::Delivered),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(delivered.pagination.total_orders, 1);
        assert_eq!(delivered.orders[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_set_order_status_validates_name() {
        let store = InMemoryStore::new();
        let order = place(&store, UserId::new(), BookId::new()).await;
        let queries = queries(&store);

        let err = queries.set_order_status(order.id, "lost").await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidStatus(_)));

        let err = queries
            .set_order_status(OrderId::new(), "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OrderNotFound(_)));

        let view = queries.set_order_status(order.id, "cancelled").await.unwrap();
        assert_eq!(view.status, OrderStatus::Cancelled);

        let view = queries.set_order_status(order.id, "pending").await.unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
    }
}
