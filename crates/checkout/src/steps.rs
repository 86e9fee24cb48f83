//! Checkout step names, used as log fields.

/// Step name: read-only validation of cart, account, and stock.
pub const STEP_VALIDATE: &str = "validate";

/// Step name: conditionally decrement stock for each cart line.
pub const STEP_DECREMENT_STOCK: &str = "decrement_stock";

/// Step name: debit the order total from the account balance.
pub const STEP_DEBIT_BALANCE: &str = "debit_balance";

/// Step name: persist the order record.
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step name: delete the user's cart lines.
pub const STEP_CLEAR_CART: &str = "clear_cart";
