// src/handlers/admin.rs
//
// Rotas administrativas. Todas passam pelo auth_guard e pelo guardião
// RequireAdmin; a identidade chega resolvida, o handler não re-deriva
// papel nenhum.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AuthenticatedUser, RequireAdmin},
    models::billing::{
        Payment, PaymentStatusUpdatePayload, Receipt, ReceiptStatusUpdatePayload,
    },
    models::catalog::{
        AddPackVariantItemPayload, Category, CreateCategoryPayload, CreatePackPayload,
        CreatePackVariantPayload, CreateProductPayload, Pack, PackVariant, PackVariantItem,
        ProductResponse, UpdateProductPayload,
    },
    models::order::{
        AdminOrderDetail, Order, OrderListResponse, OrderStatusUpdatePayload,
    },
};

// ---
// Pedidos
// ---

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Admin",
    responses((status = 200, description = "Todos os pedidos", body = [OrderListResponse])),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
) -> Result<Json<Vec<OrderListResponse>>, AppError> {
    let orders = app_state.order_service.admin_list().await?;
    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{order_id}",
    tag = "Admin",
    responses(
        (status = 200, description = "Pedido com cliente, comprovante e pagamento", body = AdminOrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("order_id" = i64, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn order_detail(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Path(order_id): Path<i64>,
) -> Result<Json<AdminOrderDetail>, AppError> {
    let detail = app_state.order_service.admin_detail(order_id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{order_id}",
    tag = "Admin",
    request_body = OrderStatusUpdatePayload,
    responses(
        (status = 200, description = "Status atualizado", body = Order),
        (status = 400, description = "Transição fora da matriz permitida")
    ),
    params(("order_id" = i64, Path, description = "ID do pedido")),
    security(("api_jwt" = []))
)]
pub async fn update_order_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireAdmin,
    Path(order_id): Path<i64>,
    Json(payload): Json<OrderStatusUpdatePayload>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .transition_status(order_id, &payload.status, &admin)
        .await?;
    Ok(Json(order))
}

// ---
// Produtos
// ---

#[utoipa::path(
    get,
    path = "/api/admin/products",
    tag = "Admin",
    responses((status = 200, description = "Todos os produtos, inclusive inativos", body = [ProductResponse])),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = app_state.catalog_service.list_products_admin().await?;
    Ok(Json(products))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    tag = "Admin",
    request_body = CreateProductPayload,
    responses((status = 201, description = "Produto criado", body = ProductResponse)),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let product = app_state.catalog_service.create_product(&payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/products/{product_id}",
    tag = "Admin",
    request_body = UpdateProductPayload,
    responses(
        (status = 200, description = "Produto atualizado", body = ProductResponse),
        (status = 404, description = "Produto não encontrado")
    ),
    params(("product_id" = i64, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Path(product_id): Path<i64>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<Json<ProductResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let product = app_state
        .catalog_service
        .update_product(product_id, &payload)
        .await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{product_id}",
    tag = "Admin",
    responses(
        (status = 200, description = "Produto desativado (soft delete)"),
        (status = 404, description = "Produto não encontrado")
    ),
    params(("product_id" = i64, Path, description = "ID do produto")),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Path(product_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    app_state.catalog_service.deactivate_product(product_id).await?;
    Ok(Json(serde_json::json!({ "message": "Produto desativado" })))
}

// ---
// Categorias e packs
// ---

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    tag = "Admin",
    request_body = CreateCategoryPayload,
    responses((status = 201, description = "Categoria criada", body = Category)),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let category = app_state.catalog_service.create_category(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    post,
    path = "/api/admin/packs",
    tag = "Admin",
    request_body = CreatePackPayload,
    responses((status = 201, description = "Pack criado", body = Pack)),
    security(("api_jwt" = []))
)]
pub async fn create_pack(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Json(payload): Json<CreatePackPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let pack = app_state
        .catalog_service
        .create_pack(&payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(pack)))
}

#[utoipa::path(
    post,
    path = "/api/admin/packs/{pack_id}/variants",
    tag = "Admin",
    request_body = CreatePackVariantPayload,
    responses(
        (status = 201, description = "Variante criada", body = PackVariant),
        (status = 404, description = "Pack não encontrado")
    ),
    params(("pack_id" = i64, Path, description = "ID do pack")),
    security(("api_jwt" = []))
)]
pub async fn create_pack_variant(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Path(pack_id): Path<i64>,
    Json(payload): Json<CreatePackVariantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let variant = app_state
        .catalog_service
        .create_pack_variant(pack_id, &payload.name, payload.price)
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

#[utoipa::path(
    post,
    path = "/api/admin/pack-variants/{variant_id}/items",
    tag = "Admin",
    request_body = AddPackVariantItemPayload,
    responses(
        (status = 201, description = "Componente adicionado", body = PackVariantItem),
        (status = 404, description = "Variante ou produto não encontrado")
    ),
    params(("variant_id" = i64, Path, description = "ID da variante")),
    security(("api_jwt" = []))
)]
pub async fn add_pack_variant_item(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    Path(variant_id): Path<i64>,
    Json(payload): Json<AddPackVariantItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let item = app_state
        .catalog_service
        .add_pack_variant_item(variant_id, payload.product_id, payload.qty)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

// ---
// Comprovantes e pagamentos
// ---

#[utoipa::path(
    patch,
    path = "/api/admin/receipts/{receipt_id}",
    tag = "Admin",
    request_body = ReceiptStatusUpdatePayload,
    responses(
        (status = 200, description = "Comprovante revisado; aprovação verifica o pagamento e avança o pedido", body = Receipt),
        (status = 400, description = "Status fora do conjunto permitido")
    ),
    params(("receipt_id" = i64, Path, description = "ID do comprovante")),
    security(("api_jwt" = []))
)]
pub async fn update_receipt_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireAdmin,
    Path(receipt_id): Path<i64>,
    Json(payload): Json<ReceiptStatusUpdatePayload>,
) -> Result<Json<Receipt>, AppError> {
    let receipt = app_state
        .billing_service
        .review_receipt(
            receipt_id,
            &payload.status,
            payload.admin_note.as_deref(),
            &admin,
        )
        .await?;
    Ok(Json(receipt))
}

#[utoipa::path(
    patch,
    path = "/api/admin/payments/{payment_id}",
    tag = "Admin",
    request_body = PaymentStatusUpdatePayload,
    responses(
        (status = 200, description = "Pagamento revisado", body = Payment),
        (status = 400, description = "Status fora do conjunto permitido")
    ),
    params(("payment_id" = i64, Path, description = "ID do pagamento")),
    security(("api_jwt" = []))
)]
pub async fn update_payment_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireAdmin,
    Path(payment_id): Path<i64>,
    Json(payload): Json<PaymentStatusUpdatePayload>,
) -> Result<Json<Payment>, AppError> {
    let payment = app_state
        .billing_service
        .review_payment(payment_id, &payload.status, &admin)
        .await?;
    Ok(Json(payment))
}
