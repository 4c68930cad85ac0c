// src/db/billing_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::billing::{Payment, PaymentStatus, Receipt, ReceiptStatus},
};

#[derive(Clone)]
pub struct BillingRepository {
    pool: SqlitePool,
}

impl BillingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---
    // Pagamentos
    // ---

    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        order_id: i64,
        method: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (order_id, method, status, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(method)
        .bind(PaymentStatus::Pending)
        .bind(created_at)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    pub async fn find_payment<'e, E>(
        &self,
        executor: E,
        payment_id: i64,
    ) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(payment_id)
            .fetch_optional(executor)
            .await?;
        Ok(payment)
    }

    // O pagamento canônico de um pedido: a linha mais antiga. Só a
    // criação de pedido insere pagamentos, então na prática há um por
    // pedido; o desempate por created_at/id é o contrato explícito.
    pub async fn canonical_payment_for_order<'e, E>(
        &self,
        executor: E,
        order_id: i64,
    ) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE order_id = ?1
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
        Ok(payment)
    }

    pub async fn mark_payment_verified<'e, E>(
        &self,
        executor: E,
        payment_id: i64,
        verified_by: i64,
        verified_at: DateTime<Utc>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = ?2, verified_by = ?3, verified_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(PaymentStatus::Verified)
        .bind(verified_by)
        .bind(verified_at)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    // Rebaixa o status sem mexer nos carimbos de verificação (usado nas
    // transições para pending/failed do caminho de override do admin).
    pub async fn update_payment_status<'e, E>(
        &self,
        executor: E,
        payment_id: i64,
        status: PaymentStatus,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(payment_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    // ---
    // Comprovantes
    // ---

    pub async fn insert_receipt<'e, E>(
        &self,
        executor: E,
        order_id: i64,
        user_id: i64,
        file_url: &str,
        file_key: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            INSERT INTO receipts (order_id, user_id, file_url, file_key, status, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(file_url)
        .bind(file_key)
        .bind(ReceiptStatus::Submitted)
        .bind(uploaded_at)
        .fetch_one(executor)
        .await?;
        Ok(receipt)
    }

    pub async fn find_receipt<'e, E>(
        &self,
        executor: E,
        receipt_id: i64,
    ) -> Result<Option<Receipt>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?1")
            .bind(receipt_id)
            .fetch_optional(executor)
            .await?;
        Ok(receipt)
    }

    // O comprovante que vale é o mais recente por uploaded_at.
    pub async fn latest_receipt_for_order<'e, E>(
        &self,
        executor: E,
        order_id: i64,
    ) -> Result<Option<Receipt>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT * FROM receipts
            WHERE order_id = ?1
            ORDER BY uploaded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
        Ok(receipt)
    }

    // Atualiza status e, quando fornecida, a observação do admin
    // (COALESCE preserva a observação anterior se nada vier).
    pub async fn update_receipt_review<'e, E>(
        &self,
        executor: E,
        receipt_id: i64,
        status: ReceiptStatus,
        admin_note: Option<&str>,
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts
            SET status = ?2, admin_note = COALESCE(?3, admin_note)
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(receipt_id)
        .bind(status)
        .bind(admin_note)
        .fetch_one(executor)
        .await?;
        Ok(receipt)
    }
}
