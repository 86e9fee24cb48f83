//! Catalog records and stock availability.

use common::{BookId, CategoryId};
use serde::{Deserialize, Serialize};

use crate::Money;

/// A book in the catalog.
///
/// `stock` never goes below zero; the inventory store only lowers it through
/// a conditional decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub price: Money,
    pub stock: u32,
    pub category: Option<CategoryId>,
}

impl Book {
    /// Creates a book with no category.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: author.into(),
            price,
            stock,
            category: None,
        }
    }

    /// Sets the book's category.
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    /// Returns a shortage record if fewer than `requested` copies are in stock.
    pub fn shortage_for(&self, requested: u32) -> Option<Shortage> {
        (self.stock < requested).then(|| Shortage {
            book_id: self.id,
            title: self.title.clone(),
            available: self.stock,
            requested,
        })
    }
}

/// A cart line that cannot be satisfied from current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub book_id: BookId,
    pub title: String,
    pub available: u32,
    pub requested: u32,
}

impl std::fmt::Display for Shortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\": {} requested, {} available",
            self.title, self.requested, self.available
        )
    }
}
