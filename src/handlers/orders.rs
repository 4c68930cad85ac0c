// src/handlers/orders.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::billing::Receipt,
    models::order::{CreateOrderPayload, OrderListResponse, OrderResponse},
};

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado com total calculado no servidor", body = OrderResponse),
        (status = 400, description = "Carrinho inválido ou estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    // Validação padrão do Validator
    payload.validate().map_err(AppError::ValidationError)?;

    // Nossa validação de consistência manual (exatamente uma origem por
    // linha), mantendo o padrão de resposta do Validator.
    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("items", e);
        AppError::ValidationError(errors)
    })?;

    let order = app_state.order_service.create_order(user.id, &payload).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/orders/my",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos do usuário autenticado", body = [OrderListResponse])
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_orders(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<OrderListResponse>>, AppError> {
    let orders = app_state.order_service.list_my(&user).await?;
    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Detalhe do pedido", body = OrderResponse),
        (status = 403, description = "Pedido de outro usuário"),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("order_id" = i64, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = app_state.order_service.get_order(order_id, &user).await?;
    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/receipt",
    tag = "Orders",
    responses(
        (status = 201, description = "Comprovante armazenado", body = Receipt),
        (status = 403, description = "Só o dono do pedido envia comprovante")
    ),
    params(("order_id" = i64, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn upload_receipt(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    // Procura o campo "file" do formulário multipart.
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.to_string()))?
    {
        if field.name() == Some("file") {
            let original_name = field.file_name().unwrap_or("comprovante").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
            file = Some((original_name, bytes.to_vec()));
        }
    }

    let (original_name, bytes) =
        file.ok_or_else(|| AppError::InvalidUpload("campo 'file' ausente".into()))?;

    let receipt = app_state
        .billing_service
        .upload_receipt(order_id, &user, &original_name, &bytes)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}/receipt",
    tag = "Orders",
    responses(
        (status = 200, description = "Comprovante mais recente do pedido", body = Receipt),
        (status = 404, description = "Pedido sem comprovante")
    ),
    params(("order_id" = i64, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn get_order_receipt(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Receipt>, AppError> {
    let receipt = app_state
        .billing_service
        .get_order_receipt(order_id, &user)
        .await?;
    Ok(Json(receipt))
}
