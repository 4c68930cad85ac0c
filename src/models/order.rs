// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::error::AppError;
use crate::models::billing::{Payment, Receipt, ReceiptStatus};

// --- Status do Pedido ---
// Máquina de estados: pending → paid → confirmed → out_for_delivery,
// com cancelled alcançável a partir de pending ou paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Confirmed,
    OutForDelivery,
    Cancelled,
}

impl OrderStatus {
    // Converte a string recebida da API; qualquer valor fora do conjunto
    // conhecido é rejeitado antes de chegar ao banco.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "out_for_delivery" => Ok(OrderStatus::OutForDelivery),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(AppError::InvalidStatus(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    // A matriz de transições permitidas. Pular etapas (ex.: pending
    // direto para out_for_delivery) é rejeitado; cancelled e
    // out_for_delivery são terminais.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Confirmed)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::OutForDelivery)
        )
    }
}

// --- Entidades ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    // Soma dos line_total dos itens; imutável após a criação.
    pub total_amount: i64,
    pub delivery_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

// Snapshot de uma linha comprada: nome e preço são congelados no momento
// do pedido e não mudam se o produto for renomeado ou reprecificado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    // NULL quando a linha é um combo (pack variant).
    pub product_id: Option<i64>,
    pub name_snapshot: String,
    pub unit_price: i64,
    pub qty: i64,
    pub line_total: i64,
}

// --- Payloads ---

// Uma linha do carrinho: ou produto avulso, ou variante de pack.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePayload {
    pub product_id: Option<i64>,
    pub pack_variant_id: Option<i64>,
    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    pub qty: i64,
}

fn default_payment_method() -> String {
    "etransfer".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "O carrinho não pode estar vazio."), nested)]
    pub items: Vec<CartLinePayload>,
    #[validate(length(min = 1, message = "O endereço de entrega é obrigatório."))]
    pub delivery_address: String,
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    // etransfer, bank, cash...
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

impl CreateOrderPayload {
    // Validação de consistência que o derive não cobre: cada linha deve
    // apontar para exatamente uma das duas origens.
    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        for line in &self.items {
            if line.product_id.is_some() == line.pack_variant_id.is_some() {
                return Err(ValidationError::new("ExactlyOneLineSource"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusUpdatePayload {
    pub status: String,
}

// --- Respostas ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub delivery_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub has_receipt: bool,
    pub receipt_status: Option<ReceiptStatus>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub id: i64,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
}

// Visão completa para o admin: pedido + cliente + comprovante mais
// recente + pagamento canônico.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub delivery_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub receipt: Option<Receipt>,
    pub payment: Option<Payment>,
}
