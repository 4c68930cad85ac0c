// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Catalog ---
        handlers::catalog::list_categories,
        handlers::catalog::list_products,
        handlers::catalog::list_packs,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::get_my_orders,
        handlers::orders::get_order,
        handlers::orders::upload_receipt,
        handlers::orders::get_order_receipt,

        // --- Uploads ---
        handlers::uploads::get_uploaded_file,

        // --- Admin ---
        handlers::admin::list_orders,
        handlers::admin::order_detail,
        handlers::admin::update_order_status,
        handlers::admin::list_products,
        handlers::admin::create_product,
        handlers::admin::update_product,
        handlers::admin::delete_product,
        handlers::admin::create_category,
        handlers::admin::create_pack,
        handlers::admin::create_pack_variant,
        handlers::admin::add_pack_variant_item,
        handlers::admin::update_receipt_status,
        handlers::admin::update_payment_status,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Catalog ---
            models::catalog::Category,
            models::catalog::Product,
            models::catalog::Pack,
            models::catalog::PackVariant,
            models::catalog::PackVariantItem,
            models::catalog::ProductResponse,
            models::catalog::PackResponse,
            models::catalog::PackVariantResponse,
            models::catalog::PackVariantItemResponse,
            models::catalog::CreateCategoryPayload,
            models::catalog::CreateProductPayload,
            models::catalog::UpdateProductPayload,
            models::catalog::CreatePackPayload,
            models::catalog::CreatePackVariantPayload,
            models::catalog::AddPackVariantItemPayload,

            // --- Inventory ---
            models::inventory::StockMovementReason,
            models::inventory::StockMovement,

            // --- Orders ---
            models::order::OrderStatus,
            models::order::Order,
            models::order::OrderItem,
            models::order::CartLinePayload,
            models::order::CreateOrderPayload,
            models::order::OrderStatusUpdatePayload,
            models::order::OrderResponse,
            models::order::OrderListResponse,
            models::order::AdminOrderDetail,

            // --- Billing ---
            models::billing::PaymentStatus,
            models::billing::Payment,
            models::billing::ReceiptStatus,
            models::billing::Receipt,
            models::billing::ReceiptStatusUpdatePayload,
            models::billing::PaymentStatusUpdatePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Catalog", description = "Vitrine de Produtos, Categorias e Packs"),
        (name = "Orders", description = "Criação e Acompanhamento de Pedidos"),
        (name = "Uploads", description = "Arquivos de Comprovante"),
        (name = "Admin", description = "Gestão de Pedidos, Catálogo, Comprovantes e Pagamentos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
