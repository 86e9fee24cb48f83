//! Checkout orchestrator: validate, commit, compensate.

use std::collections::HashMap;
use std::time::Duration;

use common::{BookId, UserId};
use domain::{Account, Book, Order, OrderDraft, OrderItem, OrderView, Shortage, UserSummary};
use store::{AccountStore, CartStore, InventoryStore, OrderStore};
use tokio::time::Instant;
use tracing::Instrument;

use crate::compensation::AppliedEffects;
use crate::error::{CheckoutError, Result};
use crate::steps;

/// A cart line resolved against the catalog snapshot taken during validation.
#[derive(Debug, Clone)]
struct PlannedLine {
    book: Book,
    quantity: u32,
}

/// Everything the commit phase needs, fixed at validation time.
#[derive(Debug, Clone)]
struct CheckoutPlan {
    account: Account,
    lines: Vec<PlannedLine>,
    draft: OrderDraft,
}

/// Converts a user's cart into an order across four independent stores.
///
/// Validation is read-only and advisory. The conditional stock decrement at
/// commit time is the only guard against concurrent checkouts of the same
/// book. Any commit failure reverses the effects already applied before the
/// error is returned.
///
/// With a timeout configured, the deadline bounds validation and is checked
/// before each commit step up to order creation. Missing it mid-commit is a
/// commit failure and is compensated. Compensation and cart clearing are
/// never cut short.
#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator<C, I, A, O> {
    cart: C,
    inventory: I,
    accounts: A,
    orders: O,
    timeout: Option<Duration>,
}

impl<C, I, A, O> CheckoutOrchestrator<C, I, A, O>
where
    C: CartStore + Clone + 'static,
    I: InventoryStore + Clone + 'static,
    A: AccountStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
{
    /// Creates a new orchestrator over the given stores, with no deadline.
    pub fn new(cart: C, inventory: I, accounts: A, orders: O) -> Self {
        Self {
            cart,
            inventory,
            accounts,
            orders,
            timeout: None,
        }
    }

    /// Bounds each checkout by `timeout`, measured from the call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Checks out the user's cart.
    ///
    /// Returns the created order populated for display. On a business-rule
    /// failure nothing is mutated. On a commit failure every applied effect is
    /// compensated and the original error is returned.
    ///
    /// The checkout runs on its own task, so dropping the returned future
    /// neither interrupts compensation nor loses the outcome's metrics and logs.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<OrderView> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let this = self.clone();
        tokio::spawn(async move { this.record(user_id, deadline).await }.in_current_span())
            .await
            .map_err(|e| CheckoutError::Interrupted(e.to_string()))?
    }

    async fn record(&self, user_id: UserId, deadline: Option<Instant>) -> Result<OrderView> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(user_id, deadline).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(view) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %view.id,
                    total = %view.total_price,
                    items = view.items.len(),
                    "checkout completed"
                );
            }
            Err(e) if e.is_rejection() => {
                metrics::counter!("checkout_rejected_total", "reason" => e.reason()).increment(1);
                tracing::warn!(reason = e.reason(), error = %e, "checkout rejected");
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total", "reason" => e.reason()).increment(1);
                tracing::error!(reason = e.reason(), error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run(&self, user_id: UserId, deadline: Option<Instant>) -> Result<OrderView> {
        let plan = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.validate(user_id))
                .await
                .map_err(|_| CheckoutError::Timeout {
                    step: steps::STEP_VALIDATE,
                })??,
            None => self.validate(user_id).await?,
        };

        let commit = CommitPhase {
            inventory: &self.inventory,
            accounts: &self.accounts,
            orders: &self.orders,
            cart: &self.cart,
            deadline,
        };
        let lines: Vec<(BookId, u32)> = plan
            .lines
            .iter()
            .map(|line| (line.book.id, line.quantity))
            .collect();
        let order = commit.run(user_id, &lines, plan.draft).await?;

        let books: HashMap<BookId, Book> = plan
            .lines
            .into_iter()
            .map(|line| (line.book.id, line.book))
            .collect();
        Ok(OrderView::build(
            order,
            UserSummary::from(&plan.account),
            |book_id| books.get(&book_id),
        ))
    }

    /// Read-only pass. Nothing is mutated whatever the outcome.
    async fn validate(&self, user_id: UserId) -> Result<CheckoutPlan> {
        let cart = self.cart.find_by_user(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(CheckoutError::AccountNotFound(user_id))?;

        let mut lines = Vec::with_capacity(cart.len());
        let mut shortages: Vec<Shortage> = Vec::new();
        for line in cart {
            if line.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity(line.book_id));
            }
            let book = self
                .inventory
                .find_by_id(line.book_id)
                .await?
                .ok_or(CheckoutError::BookNotFound(line.book_id))?;
            if let Some(shortage) = book.shortage_for(line.quantity) {
                shortages.push(shortage);
            }
            lines.push(PlannedLine {
                book,
                quantity: line.quantity,
            });
        }

        if !shortages.is_empty() {
            return Err(CheckoutError::InsufficientStock { shortages });
        }

        let items = lines
            .iter()
            .map(|line| OrderItem::new(line.book.id, line.quantity, line.book.price))
            .collect();
        let draft = OrderDraft::new(user_id, items)?;

        if !account.can_afford(draft.total_price) {
            return Err(CheckoutError::InsufficientBalance {
                required: draft.total_price,
                available: account.balance,
            });
        }

        Ok(CheckoutPlan {
            account,
            lines,
            draft,
        })
    }
}

/// Store handles and deadline for one commit.
struct CommitPhase<'a, C, I, A, O> {
    cart: &'a C,
    inventory: &'a I,
    accounts: &'a A,
    orders: &'a O,
    deadline: Option<Instant>,
}

impl<C, I, A, O> CommitPhase<'_, C, I, A, O>
where
    C: CartStore,
    I: InventoryStore,
    A: AccountStore,
    O: OrderStore,
{
    async fn run(&self, user_id: UserId, lines: &[(BookId, u32)], draft: OrderDraft) -> Result<Order> {
        let mut effects = AppliedEffects::new();
        match self.apply(user_id, lines, draft, &mut effects).await {
            Ok(order) => Ok(order),
            Err(e) => {
                if !effects.is_empty() {
                    tracing::warn!(error = %e, "commit failed, compensating");
                    let report = effects
                        .compensate(self.inventory, self.accounts, self.orders)
                        .await;
                    tracing::warn!(
                        reversed = report.reversed,
                        failed = report.failed,
                        "compensation finished"
                    );
                }
                Err(e)
            }
        }
    }

    /// Fails once the deadline has passed. Steps already started run to completion.
    fn ensure_time_left(&self, step: &'static str) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CheckoutError::Timeout { step }),
            _ => Ok(()),
        }
    }

    async fn apply(
        &self,
        user_id: UserId,
        lines: &[(BookId, u32)],
        draft: OrderDraft,
        effects: &mut AppliedEffects,
    ) -> Result<Order> {
        tracing::debug!(step = steps::STEP_DECREMENT_STOCK, lines = lines.len(), "step started");
        for &(book_id, quantity) in lines {
            self.ensure_time_left(steps::STEP_DECREMENT_STOCK)?;
            match self.inventory.conditional_decrement(book_id, quantity).await? {
                Some(_) => effects.stock_decremented(book_id, quantity),
                None => return Err(CheckoutError::ConcurrentStockExhaustion { book_id }),
            }
        }

        let total = draft.total_price;
        self.ensure_time_left(steps::STEP_DEBIT_BALANCE)?;
        tracing::debug!(step = steps::STEP_DEBIT_BALANCE, %total, "step started");
        self.accounts.decrement_balance(user_id, total).await?;
        effects.balance_debited(user_id, total);

        self.ensure_time_left(steps::STEP_CREATE_ORDER)?;
        tracing::debug!(step = steps::STEP_CREATE_ORDER, "step started");
        let order = self.orders.create(draft).await?;
        effects.order_created(order.id);

        // No deadline check once the order exists
        tracing::debug!(step = steps::STEP_CLEAR_CART, order_id = %order.id, "step started");
        self.cart.delete_all_by_user(user_id).await?;

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, OrderStatus};
    use store::InMemoryStore;

    use super::*;

    type Orchestrator =
        CheckoutOrchestrator<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore>;

    fn orchestrator(store: &InMemoryStore) -> Orchestrator {
        CheckoutOrchestrator::new(store.clone(), store.clone(), store.clone(), store.clone())
    }

    async fn seed(store: &InMemoryStore, balance: i64, price: i64, stock: u32) -> (Account, Book) {
        let account = Account::new("Ada", "ada@example.com", Money::from_cents(balance));
        let book = Book::new("Dune", "Frank Herbert", Money::from_cents(price), stock);
        store.insert_account(account.clone()).await;
        store.insert_book(book.clone()).await;
        (account, book)
    }

    #[tokio::test]
    async fn test_checkout_builds_view_from_snapshot() {
        let store = InMemoryStore::new();
        let (account, book) = seed(&store, 5_000, 1_250, 4).await;
        store.upsert_cart_line(account.id, book.id, 2).await;

        let view = orchestrator(&store).checkout(account.id).await.unwrap();

        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.total_price, Money::from_cents(2_500));
        assert_eq!(view.user.email, "ada@example.com");
        assert_eq!(view.items[0].title, "Dune");
        assert_eq!(view.items[0].price, Money::from_cents(1_250));
    }

    #[tokio::test]
    async fn test_missing_book_aborts_before_stock_check() {
        let store = InMemoryStore::new();
        let (account, book) = seed(&store, 5_000, 100, 0).await;
        let gone = BookId::new();
        store.upsert_cart_line(account.id, gone, 1).await;
        store.upsert_cart_line(account.id, book.id, 1).await;

        let err = orchestrator(&store).checkout(account.id).await.unwrap_err();

        assert!(matches!(err, CheckoutError::BookNotFound(id) if id == gone));
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected_without_mutation() {
        let store = InMemoryStore::new();
        let (account, book) = seed(&store, i64::MAX, i64::MAX / 2, 10).await;
        store.upsert_cart_line(account.id, book.id, 3).await;

        let err = orchestrator(&store).checkout(account.id).await.unwrap_err();

        assert!(matches!(err, CheckoutError::AmountOverflow));
        assert_eq!(store.book(book.id).await.unwrap().stock, 10);
        assert_eq!(store.cart_len(account.id).await, 1);
    }

    #[tokio::test]
    async fn test_balance_equal_to_total_is_enough() {
        let store = InMemoryStore::new();
        let (account, book) = seed(&store, 1_000, 500, 2).await;
        store.upsert_cart_line(account.id, book.id, 2).await;

        orchestrator(&store).checkout(account.id).await.unwrap();

        assert_eq!(
            store.account(account.id).await.unwrap().balance,
            Money::zero()
        );
    }
}
