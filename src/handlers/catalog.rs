// src/handlers/catalog.rs
//
// Vitrine pública: categorias, produtos ativos e packs com variantes.
// Nenhuma rota aqui exige autenticação.

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::{Category, PackResponse, ProductResponse},
};

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    responses(
        (status = 200, description = "Lista de categorias", body = [Category])
    )
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = app_state.catalog_service.list_categories().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    responses(
        (status = 200, description = "Produtos ativos com nome de categoria", body = [ProductResponse])
    )
)]
pub async fn list_products(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = app_state.catalog_service.list_products_public().await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/packs",
    tag = "Catalog",
    responses(
        (status = 200, description = "Packs ativos com variantes e componentes", body = [PackResponse])
    )
)]
pub async fn list_packs(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<PackResponse>>, AppError> {
    let packs = app_state.catalog_service.list_packs().await?;
    Ok(Json(packs))
}
