// src/models/inventory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Motivo de cada linha do livro-razão de estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockMovementReason {
    InitialStock,
    Sale,
    CancelReturn,
    Correction,
}

// Livro-razão (auditoria): toda mutação de stock_qty gera uma linha
// aqui, gravada na mesma transação da mutação.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub order_id: Option<i64>,
    // Delta com sinal: negativo numa venda, positivo numa devolução.
    pub quantity_changed: i64,
    pub reason: StockMovementReason,
    pub created_at: DateTime<Utc>,
}
