//! Reversal of commit effects after a failed checkout.

use common::{BookId, OrderId, UserId};
use domain::{Money, OrderStatus};
use store::{AccountStore, InventoryStore, OrderStore};

use crate::steps;

/// Effects applied so far by one checkout's commit phase, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedEffects {
    stock: Vec<(BookId, u32)>,
    debit: Option<(UserId, Money)>,
    order: Option<OrderId>,
}

impl AppliedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful conditional stock decrement.
    pub fn stock_decremented(&mut self, book_id: BookId, quantity: u32) {
        self.stock.push((book_id, quantity));
    }

    /// Records a successful balance debit.
    pub fn balance_debited(&mut self, user_id: UserId, amount: Money) {
        self.debit = Some((user_id, amount));
    }

    /// Records a successfully created order.
    pub fn order_created(&mut self, order_id: OrderId) {
        self.order = Some(order_id);
    }

    /// Returns true if nothing has been applied.
    pub fn is_empty(&self) -> bool {
        self.stock.is_empty() && self.debit.is_none() && self.order.is_none()
    }

    /// Reverses every recorded effect, newest first.
    ///
    /// Each reversal is attempted even if an earlier one failed; failures are
    /// logged and counted, never returned.
    #[tracing::instrument(skip_all, fields(stock_lines = self.stock.len()))]
    pub async fn compensate<I, A, O>(
        self,
        inventory: &I,
        accounts: &A,
        orders: &O,
    ) -> CompensationReport
    where
        I: InventoryStore,
        A: AccountStore,
        O: OrderStore,
    {
        let mut report = CompensationReport::default();

        // An order has no delete; cancelling it is the reversal
        if let Some(order_id) = self.order {
            match orders.update_status(order_id, OrderStatus::Cancelled).await {
                Ok(_) => report.reversed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(step = steps::STEP_CREATE_ORDER, %order_id, error = %e, "compensation failed");
                }
            }
        }

        if let Some((user_id, amount)) = self.debit {
            match accounts.increment_balance(user_id, amount).await {
                Ok(()) => report.reversed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(step = steps::STEP_DEBIT_BALANCE, %user_id, %amount, error = %e, "compensation failed");
                }
            }
        }

        for (book_id, quantity) in self.stock.into_iter().rev() {
            match inventory.increment(book_id, quantity).await {
                Ok(()) => report.reversed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(step = steps::STEP_DECREMENT_STOCK, %book_id, quantity, error = %e, "compensation failed");
                }
            }
        }

        metrics::counter!("checkout_compensations_total").increment(1);
        if report.failed > 0 {
            metrics::counter!("checkout_compensation_failures_total").increment(report.failed);
        }

        report
    }
}

/// Outcome of a compensation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Effects successfully reversed.
    pub reversed: u64,
    /// Effects whose reversal failed and were left in place.
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use domain::{Account, Book, OrderDraft, OrderItem};
    use store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_empty_effects_reverse_nothing() {
        let store = InMemoryStore::new();
        let report = AppliedEffects::new()
            .compensate(&store, &store, &store)
            .await;
        assert_eq!(report, CompensationReport::default());
    }

    #[tokio::test]
    async fn test_reverses_stock_balance_and_order() {
        let store = InMemoryStore::new();
        let book = Book::new("Dune", "Frank Herbert", Money::from_cents(1000), 1);
        let account = Account::new("Ada", "ada@example.com", Money::from_cents(0));
        store.insert_book(book.clone()).await;
        store.insert_account(account.clone()).await;
        let order = store
            .create(
                OrderDraft::new(
                    account.id,
                    vec![OrderItem::new(book.id, 2, Money::from_cents(1000))],
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let mut effects = AppliedEffects::new();
        effects.stock_decremented(book.id, 2);
        effects.balance_debited(account.id, Money::from_cents(2000));
        effects.order_created(order.id);

        let report = effects.compensate(&store, &store, &store).await;

        assert_eq!(report.reversed, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(store.book(book.id).await.unwrap().stock, 3);
        assert_eq!(
            store.account(account.id).await.unwrap().balance,
            Money::from_cents(2000)
        );
        let cancelled = OrderStore::find_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_failed_reversal_does_not_stop_the_rest() {
        let store = InMemoryStore::new();
        let account = Account::new("Ada", "ada@example.com", Money::from_cents(0));
        store.insert_account(account.clone()).await;
        store.set_fail_on_increment(true).await;

        let mut effects = AppliedEffects::new();
        effects.stock_decremented(BookId::new(), 1);
        effects.stock_decremented(BookId::new(), 1);
        effects.balance_debited(account.id, Money::from_cents(500));

        let report = effects.compensate(&store, &store, &store).await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.reversed, 1);
        assert_eq!(
            store.account(account.id).await.unwrap().balance,
            Money::from_cents(500)
        );
    }
}
