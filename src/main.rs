// src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger. RUST_LOG controla o filtro; "info" é o padrão.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não
    // deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("Migrações do banco de dados executadas com sucesso!");

    // Semeia a conta de admin configurada no ambiente (idempotente).
    let admin_email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@quitanda.com.br".to_string());
    let admin_password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "Admin123!".to_string());
    app_state
        .auth_service
        .ensure_admin(&admin_email, &admin_password)
        .await
        .expect("Falha ao semear a conta de admin.");

    let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Define as rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let order_routes = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route("/my", get(handlers::orders::get_my_orders))
        .route("/{order_id}", get(handlers::orders::get_order))
        .route(
            "/{order_id}/receipt",
            post(handlers::orders::upload_receipt).get(handlers::orders::get_order_receipt),
        )
        // O upload de comprovante precisa de um limite de corpo maior
        // que o padrão do axum.
        .layer(DefaultBodyLimit::max((max_upload_mb + 2) * 1024 * 1024))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/orders", get(handlers::admin::list_orders))
        .route(
            "/orders/{order_id}",
            get(handlers::admin::order_detail).patch(handlers::admin::update_order_status),
        )
        .route(
            "/products",
            get(handlers::admin::list_products).post(handlers::admin::create_product),
        )
        .route(
            "/products/{product_id}",
            patch(handlers::admin::update_product).delete(handlers::admin::delete_product),
        )
        .route("/categories", post(handlers::admin::create_category))
        .route("/packs", post(handlers::admin::create_pack))
        .route(
            "/packs/{pack_id}/variants",
            post(handlers::admin::create_pack_variant),
        )
        .route(
            "/pack-variants/{variant_id}/items",
            post(handlers::admin::add_pack_variant_item),
        )
        .route(
            "/receipts/{receipt_id}",
            patch(handlers::admin::update_receipt_status),
        )
        .route(
            "/payments/{payment_id}",
            patch(handlers::admin::update_payment_status),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route(
            "/api/uploads/{filename}",
            get(handlers::uploads::get_uploaded_file),
        )
        // Vitrine pública
        .route("/api/categories", get(handlers::catalog::list_categories))
        .route("/api/products", get(handlers::catalog::list_products))
        .route("/api/packs", get(handlers::catalog::list_packs))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!(
        "Servidor escutando em {}",
        listener.local_addr().expect("endereço local do listener")
    );
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
