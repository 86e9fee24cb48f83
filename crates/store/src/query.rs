use domain::OrderStatus;

/// Filter for administrative order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Only orders with this status.
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    /// Creates a filter matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if `status` passes the filter.
    pub fn matches(&self, status: OrderStatus) -> bool {
        self.status.is_none_or(|wanted| wanted == status)
    }
}
