// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- Pagamento ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "pending" => Ok(PaymentStatus::Pending),
            "verified" => Ok(PaymentStatus::Verified),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(AppError::InvalidStatus(raw.to_string())),
        }
    }
}

// Um registro de pagamento por pedido, criado junto com o pedido na
// mesma transação. A verificação é sempre manual (etransfer e afins);
// gateway de pagamento está fora de escopo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    // etransfer, bank, cash...
    pub method: String,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub verified_by: Option<i64>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Comprovante ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Submitted,
    Approved,
    Rejected,
}

impl ReceiptStatus {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "submitted" => Ok(ReceiptStatus::Submitted),
            "approved" => Ok(ReceiptStatus::Approved),
            "rejected" => Ok(ReceiptStatus::Rejected),
            _ => Err(AppError::InvalidStatus(raw.to_string())),
        }
    }
}

// Upload de comprovante de pagamento. Um pedido pode ter vários; o mais
// recente por uploaded_at é o que vale.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub file_url: String,
    pub file_key: String,
    pub status: ReceiptStatus,
    pub admin_note: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

// --- Payloads do admin ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptStatusUpdatePayload {
    pub status: String,
    pub admin_note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusUpdatePayload {
    pub status: String,
}
