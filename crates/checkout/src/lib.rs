//! Checkout orchestration for the bookstore.
//!
//! Converting a cart into an order touches four independent stores with no
//! transaction spanning them. The orchestrator works in two phases:
//! 1. Validate (read-only): cart non-empty, account exists, every book exists
//!    and has enough stock, balance covers the total
//! 2. Commit: conditional stock decrement per line, balance debit, order
//!    creation, cart clearing
//!
//! If any commit step fails, every effect already applied is reversed in
//! reverse order before the original error is returned.

pub mod compensation;
pub mod error;
pub mod orchestrator;
pub mod queries;
pub mod steps;

pub use compensation::{AppliedEffects, CompensationReport};
pub use error::{CheckoutError, Result};
pub use orchestrator::CheckoutOrchestrator;
pub use queries::{OrderPage, OrderQueryService};
