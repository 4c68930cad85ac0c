// src/common/test_support.rs
//
// Fixtures compartilhadas pelos testes de serviço: semeadura direta das
// tabelas e um Notifier que grava em memória o que seria enviado.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    db::{
        BillingRepository, CatalogRepository, InventoryRepository, OrderRepository,
        UserRepository,
    },
    models::auth::{User, UserRole},
    models::catalog::Product,
    services::{
        assembler::OrderAssembler,
        billing_service::BillingService,
        inventory::InventoryService,
        notifier::{Notifier, OrderEvent},
        order_service::OrderService,
        storage::ReceiptStorage,
    },
};

pub async fn seed_user(pool: &SqlitePool, email: &str, role: UserRole) -> User {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, full_name, role, is_active, created_at)
        VALUES (?1, 'hash-de-teste', ?2, ?3, 1, ?4)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(format!("Usuário {email}"))
    .bind(role)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .expect("falha ao semear usuário")
}

pub async fn seed_product(pool: &SqlitePool, name: &str, price: i64, stock: i64) -> Product {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, price, stock_qty, is_active)
        VALUES (?1, ?2, ?3, 1)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("falha ao semear produto")
}

// Cria pack + variante + componentes e devolve o id da variante.
pub async fn seed_pack_variant(
    pool: &SqlitePool,
    pack_name: &str,
    variant_name: &str,
    price: i64,
    items: &[(i64, i64)],
) -> i64 {
    let (pack_id,): (i64,) = sqlx::query_as(
        "INSERT INTO packs (name, is_active) VALUES (?1, 1) RETURNING id",
    )
    .bind(pack_name)
    .fetch_one(pool)
    .await
    .expect("falha ao semear pack");

    let (variant_id,): (i64,) = sqlx::query_as(
        "INSERT INTO pack_variants (pack_id, name, price) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(pack_id)
    .bind(variant_name)
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("falha ao semear variante");

    for (product_id, qty) in items {
        sqlx::query("INSERT INTO pack_variant_items (variant_id, product_id, qty) VALUES (?1, ?2, ?3)")
            .bind(variant_id)
            .bind(product_id)
            .bind(qty)
            .execute(pool)
            .await
            .expect("falha ao semear componente");
    }

    variant_id
}

// Pedido mínimo inserido direto na tabela, para testes que só precisam
// de um id válido como alvo de chave estrangeira.
pub async fn seed_order_row(pool: &SqlitePool, user_id: i64) -> i64 {
    let (order_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO orders (user_id, status, total_amount, delivery_address, phone, created_at)
        VALUES (?1, 'pending', 0, 'Rua de Teste, 1', '+5511999990000', ?2)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .expect("falha ao semear pedido");
    order_id
}

// Notifier de teste: registra as chamadas em vez de falar com gateway.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, OrderEvent, i64)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        phone: &str,
        event: OrderEvent,
        order_id: i64,
        _customer_name: &str,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .expect("mutex do notifier de teste")
            .push((phone.to_string(), event, order_id));
        Ok(())
    }
}

// Notifier que sempre falha, para provar que a transição não desfaz.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _phone: &str,
        _event: OrderEvent,
        _order_id: i64,
        _customer_name: &str,
    ) -> anyhow::Result<()> {
        anyhow::bail!("gateway fora do ar")
    }
}

pub fn order_service(pool: &SqlitePool, notifier: Arc<dyn Notifier>) -> OrderService {
    let catalog_repo = CatalogRepository::new(pool.clone());
    let inventory = InventoryService::new(InventoryRepository::new(pool.clone()));
    OrderService::new(
        pool.clone(),
        OrderAssembler::new(pool.clone(), catalog_repo, inventory.clone()),
        OrderRepository::new(pool.clone()),
        BillingRepository::new(pool.clone()),
        inventory,
        UserRepository::new(pool.clone()),
        notifier,
    )
}

pub fn billing_service(pool: &SqlitePool, storage: ReceiptStorage) -> BillingService {
    BillingService::new(
        pool.clone(),
        BillingRepository::new(pool.clone()),
        OrderRepository::new(pool.clone()),
        storage,
    )
}
