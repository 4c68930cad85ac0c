// src/db/inventory_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::inventory::StockMovementReason,
};

// Acesso de baixo nível ao estoque e ao livro-razão. A regra de negócio
// (erros, agregação por pedido) mora no InventoryService.
#[derive(Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn stock_of<'e, E>(
        &self,
        executor: E,
        product_id: i64,
    ) -> Result<Option<(i64, bool)>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, (i64, bool)>(
            "SELECT stock_qty, is_active FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn product_name<'e, E>(
        &self,
        executor: E,
        product_id: i64,
    ) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, (String,)>("SELECT name FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(|(name,)| name))
    }

    // O coração da correção sob concorrência: checagem e débito num
    // único UPDATE condicional. Dois pedidos disputando a última unidade
    // serializam na linha do produto e só um deles afeta alguma linha.
    // Retorna false quando o saldo era insuficiente (ou o produto não
    // existe/está inativo) no instante do débito.
    pub async fn try_reduce_stock<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        qty: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_qty = stock_qty - ?1
            WHERE id = ?2 AND is_active = 1 AND stock_qty >= ?1
            "#,
        )
        .bind(qty)
        .bind(product_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn restore_stock<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        qty: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE products SET stock_qty = stock_qty + ?1 WHERE id = ?2")
            .bind(qty)
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_stock<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        new_qty: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE products SET stock_qty = ?1 WHERE id = ?2")
            .bind(new_qty)
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Registra uma movimentação no livro-razão (auditoria).
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        order_id: Option<i64>,
        quantity_changed: i64,
        reason: StockMovementReason,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (product_id, order_id, quantity_changed, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(product_id)
        .bind(order_id)
        .bind(quantity_changed)
        .bind(reason)
        .bind(chrono::Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    // Soma dos deltas de um pedido por produto, para um dado motivo.
    // Usado no estorno de cancelamento: é daqui que sai a decomposição
    // dos combos, que o order_items não guarda.
    pub async fn movements_for_order<'e, E>(
        &self,
        executor: E,
        order_id: i64,
        reason: StockMovementReason,
    ) -> Result<Vec<(i64, i64)>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT product_id, SUM(quantity_changed)
            FROM stock_movements
            WHERE order_id = ?1 AND reason = ?2
            GROUP BY product_id
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_id)
        .bind(reason)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
