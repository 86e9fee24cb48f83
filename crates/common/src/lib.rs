//! Shared identifier types used across the bookstore workspace.

pub mod types;

pub use types::{BookId, CategoryId, IdError, OrderId, UserId};
