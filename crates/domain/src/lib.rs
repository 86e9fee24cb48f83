//! Domain model for the bookstore checkout service.
//!
//! This crate holds the plain data types shared by the stores, the checkout
//! orchestrator, and the HTTP layer:
//! - `Money` amounts in integer cents
//! - Catalog `Book` records and stock `Shortage` reports
//! - User `Account` balances and pending `CartLine`s
//! - Finalized `Order`s with their status and display views
//! - Pagination arithmetic for administrative listings

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod pagination;

pub use account::Account;
pub use cart::CartLine;
pub use catalog::{Book, Shortage};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Order, OrderDraft, OrderItem, OrderItemView, OrderStatus, OrderView, UserSummary,
};
pub use pagination::{PageRequest, Pagination};
