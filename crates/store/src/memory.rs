use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{BookId, OrderId, UserId};
use domain::{Account, Book, CartLine, Money, Order, OrderDraft, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    OrderFilter, Result, StoreError,
    store::{AccountStore, CartStore, InventoryStore, OrderStore},
};

#[derive(Debug, Default)]
struct Faults {
    /// Books whose stock is drained to zero right before the next conditional decrement.
    exhaust_on_decrement: HashSet<BookId>,
    fail_on_increment: bool,
    fail_on_balance_decrement: bool,
    fail_on_order_create: bool,
    fail_on_cart_clear: bool,
    /// Latency added before each conditional decrement, outside the lock.
    decrement_delay: Option<Duration>,
    /// Latency added before each stock increment, outside the lock.
    increment_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    books: HashMap<BookId, Book>,
    accounts: HashMap<UserId, Account>,
    /// Insertion order is cart read order.
    cart: Vec<CartLine>,
    /// Insertion order is creation order.
    orders: Vec<Order>,
    faults: Faults,
}

/// In-memory implementation of all four stores for tests and local runs.
///
/// Each operation takes the single write lock for its whole duration, which
/// makes the conditional decrement a true check-and-set. Fault-injection
/// switches simulate races and backend failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a book.
    pub async fn insert_book(&self, book: Book) {
        self.state.write().await.books.insert(book.id, book);
    }

    /// Removes a book from the catalog.
    pub async fn remove_book(&self, book_id: BookId) {
        self.state.write().await.books.remove(&book_id);
    }

    /// Adds or replaces an account.
    pub async fn insert_account(&self, account: Account) {
        self.state.write().await.accounts.insert(account.id, account);
    }

    /// Adds a cart line, replacing the quantity if the user already has the book.
    pub async fn upsert_cart_line(&self, user_id: UserId, book_id: BookId, quantity: u32) {
        let mut state = self.state.write().await;
        match state
            .cart
            .iter()
            .position(|line| line.user_id == user_id && line.book_id == book_id)
        {
            Some(index) => state.cart[index].quantity = quantity,
            None => state.cart.push(CartLine::new(user_id, book_id, quantity)),
        }
    }

    /// Returns a copy of the book, if present.
    pub async fn book(&self, book_id: BookId) -> Option<Book> {
        self.state.read().await.books.get(&book_id).cloned()
    }

    /// Returns a copy of the account, if present.
    pub async fn account(&self, user_id: UserId) -> Option<Account> {
        self.state.read().await.accounts.get(&user_id).cloned()
    }

    /// Returns the number of cart lines held for the user.
    pub async fn cart_len(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .await
            .cart
            .iter()
            .filter(|line| line.user_id == user_id)
            .count()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Drains the book's stock to zero just before its next conditional
    /// decrement, as if a concurrent checkout had won the race.
    pub async fn exhaust_on_decrement(&self, book_id: BookId) {
        self.state
            .write()
            .await
            .faults
            .exhaust_on_decrement
            .insert(book_id);
    }

    /// Configures stock increments to fail.
    pub async fn set_fail_on_increment(&self, fail: bool) {
        self.state.write().await.faults.fail_on_increment = fail;
    }

    /// Configures balance decrements to fail.
    pub async fn set_fail_on_balance_decrement(&self, fail: bool) {
        self.state.write().await.faults.fail_on_balance_decrement = fail;
    }

    /// Configures order creation to fail.
    pub async fn set_fail_on_order_create(&self, fail: bool) {
        self.state.write().await.faults.fail_on_order_create = fail;
    }

    /// Configures cart clearing to fail.
    pub async fn set_fail_on_cart_clear(&self, fail: bool) {
        self.state.write().await.faults.fail_on_cart_clear = fail;
    }

    /// Makes every conditional decrement take at least `delay`.
    pub async fn set_decrement_delay(&self, delay: Duration) {
        self.state.write().await.faults.decrement_delay = Some(delay);
    }

    /// Makes every stock increment take at least `delay`.
    pub async fn set_increment_delay(&self, delay: Duration) {
        self.state.write().await.faults.increment_delay = Some(delay);
    }

    async fn pause(&self, delay: impl FnOnce(&Faults) -> Option<Duration>) {
        let delay = delay(&self.state.read().await.faults);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::Unavailable(format!("injected failure in {operation}"))
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        if state.faults.fail_on_cart_clear {
            return Err(injected("delete_all_by_user"));
        }

        let before = state.cart.len();
        state.cart.retain(|line| line.user_id != user_id);
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&book_id).cloned())
    }

    async fn conditional_decrement(&self, book_id: BookId, quantity: u32) -> Result<Option<Book>> {
        self.pause(|faults| faults.decrement_delay).await;
        let mut state = self.state.write().await;
        let exhaust = state.faults.exhaust_on_decrement.remove(&book_id);

        let Some(book) = state.books.get_mut(&book_id) else {
            return Ok(None);
        };
        if exhaust {
            book.stock = 0;
        }
        if book.stock < quantity {
            return Ok(None);
        }

        book.stock -= quantity;
        Ok(Some(book.clone()))
    }

    async fn increment(&self, book_id: BookId, quantity: u32) -> Result<()> {
        self.pause(|faults| faults.increment_delay).await;
        let mut state = self.state.write().await;
        if state.faults.fail_on_increment {
            return Err(injected("increment"));
        }

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or_else(|| StoreError::Unavailable(format!("book {book_id} not found")))?;
        book.stock = book
            .stock
            .checked_add(quantity)
            .ok_or_else(|| StoreError::Decode(format!("stock overflow for book {book_id}")))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&user_id).cloned())
    }

    async fn decrement_balance(&self, user_id: UserId, amount: Money) -> Result<()> {
        let mut state = self.state.write().await;
        if state.faults.fail_on_balance_decrement {
            return Err(injected("decrement_balance"));
        }

        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Unavailable(format!("account {user_id} not found")))?;
        account.balance -= amount;
        Ok(())
    }

    async fn increment_balance(&self, user_id: UserId, amount: Money) -> Result<()> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Unavailable(format!("account {user_id} not found")))?;
        account.balance += amount;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order> {
        let mut state = self.state.write().await;
        if state.faults.fail_on_order_create {
            return Err(injected("create"));
        }

        let order = Order::from_draft(draft);
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self, filter: OrderFilter, skip: u64, limit: u64) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o.status))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: OrderFilter) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| filter.matches(o.status))
            .count() as u64)
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        Ok(state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .map(|order| {
                order.status = status;
                order.clone()
            }))
    }
}
