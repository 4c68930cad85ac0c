// src/config.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::db::{
    BillingRepository, CatalogRepository, InventoryRepository, OrderRepository, UserRepository,
};
use crate::services::{
    assembler::OrderAssembler,
    auth::AuthService,
    billing_service::BillingService,
    catalog_service::CatalogService,
    inventory::InventoryService,
    notifier::{DisabledNotifier, Notifier, SmsNotifier},
    order_service::OrderService,
    storage::ReceiptStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub order_service: OrderService,
    pub billing_service: BillingService,
    pub storage: ReceiptStorage,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quitanda.db".to_string());
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let connect_options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(connect_options)
            .await?;

        tracing::info!("Conexão com o banco de dados estabelecida com sucesso!");

        let upload_dir =
            PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()));
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let max_upload_mb: usize = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        // Gateway de SMS é opcional: sem as variáveis, as notificações
        // são descartadas (logadas em debug).
        let notifier: Arc<dyn Notifier> =
            match (env::var("SMS_API_URL"), env::var("SMS_API_KEY")) {
                (Ok(api_url), Ok(api_key)) => {
                    let sender =
                        env::var("SMS_SENDER").unwrap_or_else(|_| "Quitanda".to_string());
                    Arc::new(SmsNotifier::new(api_url, api_key, sender))
                }
                _ => {
                    tracing::warn!("Gateway de SMS não configurado; notificações desabilitadas.");
                    Arc::new(DisabledNotifier)
                }
            };

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let billing_repo = BillingRepository::new(db_pool.clone());

        let inventory_service = InventoryService::new(inventory_repo);
        let auth_service = AuthService::new(user_repo.clone(), jwt_secret);
        let catalog_service = CatalogService::new(
            db_pool.clone(),
            catalog_repo.clone(),
            inventory_service.clone(),
        );
        let assembler = OrderAssembler::new(
            db_pool.clone(),
            catalog_repo,
            inventory_service.clone(),
        );
        let order_service = OrderService::new(
            db_pool.clone(),
            assembler,
            order_repo.clone(),
            billing_repo.clone(),
            inventory_service,
            user_repo,
            notifier,
        );
        let storage = ReceiptStorage::new(upload_dir, public_base_url, max_upload_mb);
        let billing_service =
            BillingService::new(db_pool.clone(), billing_repo, order_repo, storage.clone());

        Ok(Self {
            db_pool,
            auth_service,
            catalog_service,
            order_service,
            billing_service,
            storage,
        })
    }
}
