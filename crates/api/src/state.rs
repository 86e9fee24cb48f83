//! Shared application state.

use std::time::Duration;

use checkout::{CheckoutOrchestrator, OrderQueryService};
use store::Storage;

use crate::auth::JwtKeys;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storage> {
    pub checkout: CheckoutOrchestrator<S, S, S, S>,
    pub queries: OrderQueryService<S, S, S>,
    pub jwt: JwtKeys,
}

impl<S: Storage> AppState<S> {
    /// Wires every service to the same storage backend. Checkouts are
    /// bounded by `request_timeout`.
    pub fn new(store: S, jwt: JwtKeys, request_timeout: Duration) -> Self {
        Self {
            checkout: CheckoutOrchestrator::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            )
            .with_timeout(request_timeout),
            queries: OrderQueryService::new(store.clone(), store.clone(), store),
            jwt,
        }
    }
}
