//! Orders and their status.

mod model;
mod status;
mod view;

pub use model::{Order, OrderDraft, OrderItem};
pub use status::OrderStatus;
pub use view::{OrderItemView, OrderView, UserSummary};
