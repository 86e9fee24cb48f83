//! Persistence collaborators for checkout.
//!
//! Each store exposes only the operations the checkout core needs. Every
//! individual operation is atomic against its backend; nothing here spans
//! more than one store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderFilter;
pub use store::{AccountStore, CartStore, InventoryStore, OrderStore, Storage};
