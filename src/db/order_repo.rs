// src/db/order_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::order::{Order, OrderItem, OrderListResponse, OrderStatus},
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---
    // Escritas (sempre dentro da transação de quem chama)
    // ---

    pub async fn insert_order<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        total_amount: i64,
        delivery_address: &str,
        phone: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, status, total_amount, delivery_address, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(OrderStatus::Pending)
        .bind(total_amount)
        .bind(delivery_address)
        .bind(phone)
        .bind(created_at)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        order_id: i64,
        product_id: Option<i64>,
        name_snapshot: &str,
        unit_price: i64,
        qty: i64,
        line_total: i64,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, name_snapshot, unit_price, qty, line_total)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(name_snapshot)
        .bind(unit_price)
        .bind(qty)
        .bind(line_total)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(order_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    // ---
    // Leituras
    // ---

    pub async fn find_order<'e, E>(
        &self,
        executor: E,
        order_id: i64,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn items_for_order<'e, E>(
        &self,
        executor: E,
        order_id: i64,
    ) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<OrderListResponse>, AppError> {
        let orders = sqlx::query_as::<_, OrderListResponse>(
            r#"
            SELECT o.id, o.status, o.total_amount, o.created_at,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            WHERE o.user_id = ?1
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn list_all(&self) -> Result<Vec<OrderListResponse>, AppError> {
        let orders = sqlx::query_as::<_, OrderListResponse>(
            r#"
            SELECT o.id, o.status, o.total_amount, o.created_at,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}
