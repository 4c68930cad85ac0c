// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// --- Produtos ---
// O catálogo de produtos avulsos. `price` é sempre em centavos e
// `stock_qty` só é mutado pelas primitivas do InventoryService.
// Produto nunca é apagado, apenas desativado (soft delete), para
// preservar os snapshots históricos dos pedidos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[schema(example = 500)]
    pub price: i64,
    pub stock_qty: i64,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: bool,
}

// --- Packs (combos) ---
// Um Pack agrupa variantes; cada variante tem preço fechado e uma lista
// de produtos componentes com multiplicador de quantidade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackVariant {
    pub id: i64,
    pub pack_id: i64,
    pub name: String,
    // Preço do combo definido pelo admin, independente da soma dos
    // componentes.
    #[schema(example = 2500)]
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackVariantItem {
    pub id: i64,
    pub variant_id: i64,
    pub product_id: i64,
    pub qty: i64,
}

// Variante carregada com o contexto que o montador de pedidos precisa:
// o nome do pack pai (para o snapshot) e os componentes.
#[derive(Debug, Clone)]
pub struct PackVariantDetail {
    pub variant: PackVariant,
    pub pack_name: String,
    pub items: Vec<PackVariantItem>,
}

// --- Respostas ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub stock_qty: i64,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: bool,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackVariantItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackVariantResponse {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub items: Vec<PackVariantItemResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub variants: Vec<PackVariantResponse>,
}

// --- Payloads do admin ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(range(min = 0, message = "O preço não pode ser negativo."))]
    pub price: i64,
    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)]
    pub stock_qty: i64,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
}

// Atualização parcial: só os campos presentes são aplicados.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "O preço não pode ser negativo."))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    pub stock_qty: Option<i64>,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackVariantPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(range(min = 0, message = "O preço não pode ser negativo."))]
    pub price: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPackVariantItemPayload {
    pub product_id: i64,
    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    pub qty: i64,
}
