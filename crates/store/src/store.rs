use async_trait::async_trait;
use common::{BookId, OrderId, UserId};
use domain::{Account, Book, CartLine, Money, Order, OrderDraft, OrderStatus};

use crate::{OrderFilter, Result};

/// Pending cart lines, keyed by user.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart lines in the order they were added.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>>;

    /// Removes every cart line of the user, returning how many were removed.
    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64>;
}

/// Book records and their stock counts.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the current record for a book.
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// Lowers stock by `quantity` only if at least `quantity` remains.
    ///
    /// The check and the write happen as one atomic operation. Returns the
    /// updated book, or `None` if the guard failed or the book is gone.
    async fn conditional_decrement(&self, book_id: BookId, quantity: u32) -> Result<Option<Book>>;

    /// Raises stock by `quantity`.
    async fn increment(&self, book_id: BookId, quantity: u32) -> Result<()>;
}

/// User accounts and balances.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns the account, including its balance.
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Account>>;

    /// Lowers the balance by `amount`. No sufficiency check is made.
    async fn decrement_balance(&self, user_id: UserId, amount: Money) -> Result<()>;

    /// Raises the balance by `amount`.
    async fn increment_balance(&self, user_id: UserId, amount: Money) -> Result<()>;
}

/// Finalized orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a draft as a new pending order.
    async fn create(&self, draft: OrderDraft) -> Result<Order>;

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Returns the user's orders, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns a window of matching orders, newest first.
    async fn find_all(&self, filter: OrderFilter, skip: u64, limit: u64) -> Result<Vec<Order>>;

    /// Counts orders matching the filter.
    async fn count(&self, filter: OrderFilter) -> Result<u64>;

    /// Overwrites the order's status. Returns `None` if the order does not exist.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus)
    -> Result<Option<Order>>;
}

/// A backend that provides all four stores.
///
/// Several store methods share a name (`find_by_id`, `find_by_user`), so
/// callers holding a `Storage` use fully-qualified syntax.
pub trait Storage:
    CartStore + InventoryStore + AccountStore + OrderStore + Clone + 'static
{
}

// Blanket implementation for every backend implementing all four stores
impl<T> Storage for T where
    T: CartStore + InventoryStore + AccountStore + OrderStore + Clone + 'static
{
}
