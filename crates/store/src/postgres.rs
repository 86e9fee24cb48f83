use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, CategoryId, OrderId, UserId};
use domain::{Account, Book, CartLine, Money, Order, OrderDraft, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderFilter, Result, StoreError,
    store::{AccountStore, CartStore, InventoryStore, OrderStore},
};

const BOOK_COLUMNS: &str = "id, title, author, price_cents, stock, category_id";
const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, status, created_at";

/// PostgreSQL-backed implementation of all four stores.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Adds or replaces a book.
    pub async fn insert_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, price_cents, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                category_id = EXCLUDED.category_id
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price.cents())
        .bind(to_i32(book.stock, "stock")?)
        .bind(book.category.map(|c| c.as_uuid()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds or replaces an account.
    pub async fn insert_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, balance_cents)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                balance_cents = EXCLUDED.balance_cents
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.balance.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds a cart line, replacing the quantity if the user already has the book.
    pub async fn upsert_cart_line(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT unique_cart_user_book
            DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_book(row: PgRow) -> Result<Book> {
        Ok(Book {
            id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_u32(row.try_get("stock")?, "stock")?,
            category: row
                .try_get::<Option<Uuid>, _>("category_id")?
                .map(CategoryId::from_uuid),
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            status: status
                .parse()
                .map_err(|e: domain::DomainError| StoreError::Decode(e.to_string()))?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    /// Loads items for the given orders, grouped by order and in stored position order.
    async fn load_items(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, book_id, quantity, price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items.entry(order_id).or_default().push(OrderItem {
                book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
                quantity: to_u32(row.try_get("quantity")?, "quantity")?,
                price: Money::from_cents(row.try_get("price_cents")?),
            });
        }
        Ok(items)
    }

    async fn hydrate_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }
}

fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Decode(format!("{column} out of range: {value}")))
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{column} out of range: {value}")))
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::Decode(format!("{what} out of range: {value}")))
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, book_id, quantity, added_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartLine {
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                    book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
                    quantity: to_u32(row.try_get("quantity")?, "quantity")?,
                    added_at: row.try_get::<DateTime<Utc>, _>("added_at")?,
                })
            })
            .collect()
    }

    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_book).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn conditional_decrement(&self, book_id: BookId, quantity: u32) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "UPDATE books SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            tracing::debug!(%book_id, quantity, "stock guard refused decrement");
        }
        row.map(Self::row_to_book).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn increment(&self, book_id: BookId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1")
            .bind(book_id.as_uuid())
            .bind(to_i32(quantity, "quantity")?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!("book {book_id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, name, email, balance_cents FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Account {
                id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                balance: Money::from_cents(row.try_get("balance_cents")?),
            })),
            None => Ok(None),
        }
    }

    async fn decrement_balance(&self, user_id: UserId, amount: Money) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET balance_cents = balance_cents - $2 WHERE id = $1")
                .bind(user_id.as_uuid())
                .bind(amount.cents())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!("account {user_id} not found")));
        }
        Ok(())
    }

    async fn increment_balance(&self, user_id: UserId, amount: Money) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET balance_cents = balance_cents + $2 WHERE id = $1")
                .bind(user_id.as_uuid())
                .bind(amount.cents())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!("account {user_id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(skip(self, draft), fields(user_id = %draft.user_id, items = draft.items.len()))]
    async fn create(&self, draft: OrderDraft) -> Result<Order> {
        let mut order = Order::from_draft(draft);

        // The order row and its items land together or not at all
        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, user_id, total_price_cents, status)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_price.cents())
        .bind(order.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Decode(format!("too many order items: {position}")))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, book_id, quantity, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position)
            .bind(item.book_id.as_uuid())
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        order.created_at = created_at;
        Ok(order)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_orders(rows).await
    }

    async fn find_all(&self, filter: OrderFilter, skip: u64, limit: u64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(to_i64(skip, "skip")?)
        .bind(to_i64(limit, "limit")?)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_orders(rows).await
    }

    async fn count(&self, filter: OrderFilter) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(filter.status.map(|s| s.as_str()))
                .fetch_one(&self.pool)
                .await?;

        u64::try_from(count).map_err(|_| StoreError::Decode(format!("negative count: {count}")))
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}
