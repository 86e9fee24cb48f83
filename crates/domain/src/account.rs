//! User accounts.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::Money;

/// A user account with a spendable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub balance: Money,
}

impl Account {
    /// Creates a new account with the given balance.
    pub fn new(name: impl Into<String>, email: impl Into<String>, balance: Money) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            balance,
        }
    }

    /// Returns true if the balance covers `amount`.
    pub fn can_afford(&self, amount: Money) -> bool {
        amount <= self.balance
    }
}
