// src/services/order_service.rs

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{BillingRepository, OrderRepository, UserRepository},
    models::auth::{User, UserRole},
    models::order::{
        AdminOrderDetail, CreateOrderPayload, Order, OrderListResponse, OrderResponse,
        OrderStatus,
    },
    services::assembler::{merge_decrements, OrderAssembler},
    services::inventory::InventoryService,
    services::notifier::{Notifier, OrderEvent},
};

// O dono do ciclo de vida do pedido. Toda mudança de status passa por
// aqui; nada fora deste serviço escreve em orders.status.
#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    assembler: OrderAssembler,
    order_repo: OrderRepository,
    billing_repo: BillingRepository,
    inventory: InventoryService,
    user_repo: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        pool: SqlitePool,
        assembler: OrderAssembler,
        order_repo: OrderRepository,
        billing_repo: BillingRepository,
        inventory: InventoryService,
        user_repo: UserRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            assembler,
            order_repo,
            billing_repo,
            inventory,
            user_repo,
            notifier,
        }
    }

    // Cria o pedido em uma única transação: cabeçalho + itens + débitos
    // de estoque + pagamento pendente. Qualquer falha no meio (inclusive
    // saldo que evaporou entre a validação e o commit) desfaz tudo.
    //
    // A montagem valida lendo a pool; a transação em si só escreve, e o
    // débito condicional reconfere o saldo no instante do commit.
    pub async fn create_order(
        &self,
        user_id: i64,
        payload: &CreateOrderPayload,
    ) -> Result<OrderResponse, AppError> {
        let assembled = self.assembler.assemble(&payload.items).await?;

        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .insert_order(
                &mut *tx,
                user_id,
                assembled.total_amount,
                &payload.delivery_address,
                &payload.phone,
                Utc::now(),
            )
            .await?;

        let mut items = Vec::with_capacity(assembled.lines.len());
        for line in &assembled.lines {
            let item = self
                .order_repo
                .insert_item(
                    &mut *tx,
                    order.id,
                    line.product_id,
                    &line.name_snapshot,
                    line.unit_price,
                    line.qty,
                    line.line_total,
                )
                .await?;
            items.push(item);
        }

        // Débitos agregados por produto: duas linhas sobre o mesmo
        // produto são cobradas de uma vez, em ordem determinística.
        for (product_id, qty) in merge_decrements(&assembled.lines) {
            self.inventory
                .reduce_stock(&mut tx, product_id, qty, order.id)
                .await?;
        }

        self.billing_repo
            .insert_payment(&mut *tx, order.id, &payload.payment_method, Utc::now())
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            user_id,
            total_amount = order.total_amount,
            "Pedido criado"
        );

        Ok(OrderResponse {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address,
            phone: order.phone,
            created_at: order.created_at,
            items,
            has_receipt: false,
            receipt_status: None,
        })
    }

    // Transição de status do admin, validada contra a matriz. O estorno
    // de estoque do cancelamento roda na mesma transação; a notificação
    // sai só depois do commit.
    pub async fn transition_status(
        &self,
        order_id: i64,
        new_status_raw: &str,
        acting_admin: &User,
    ) -> Result<Order, AppError> {
        let new_status = OrderStatus::parse(new_status_raw)?;

        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .find_order(&mut *tx, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if !order.status.can_transition_to(new_status) {
            return Err(AppError::InvalidStatus(format!(
                "{} -> {}",
                order.status.as_str(),
                new_status.as_str()
            )));
        }

        let updated = self
            .order_repo
            .update_status(&mut *tx, order_id, new_status)
            .await?;

        if new_status == OrderStatus::Cancelled {
            self.inventory.release_for_order(&mut tx, order_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id,
            from = order.status.as_str(),
            to = new_status.as_str(),
            admin_id = acting_admin.id,
            "Status do pedido atualizado"
        );

        self.notify_status_change(&updated).await;

        Ok(updated)
    }

    // Melhor esforço: falha de notificação é logada e engolida — a
    // transição já foi commitada.
    async fn notify_status_change(&self, order: &Order) {
        let event = match order.status {
            OrderStatus::Paid => OrderEvent::Paid,
            OrderStatus::Confirmed => OrderEvent::Confirmed,
            OrderStatus::OutForDelivery => OrderEvent::OutForDelivery,
            _ => return,
        };

        let customer_name = match self.user_repo.find_by_id(order.user_id).await {
            Ok(Some(user)) => user.full_name,
            _ => "Cliente".to_string(),
        };

        if let Err(err) = self
            .notifier
            .notify(&order.phone, event, order.id, &customer_name)
            .await
        {
            tracing::warn!(order_id = order.id, "Falha ao enviar SMS: {err:#}");
        }
    }

    // Cliente só enxerga os próprios pedidos; admin enxerga qualquer um.
    pub async fn get_order(
        &self,
        order_id: i64,
        requesting_user: &User,
    ) -> Result<OrderResponse, AppError> {
        let order = self
            .order_repo
            .find_order(&self.pool, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if requesting_user.role != UserRole::Admin && order.user_id != requesting_user.id {
            return Err(AppError::AccessDenied);
        }

        self.order_response(order).await
    }

    pub async fn list_my(&self, user: &User) -> Result<Vec<OrderListResponse>, AppError> {
        self.order_repo.list_for_user(user.id).await
    }

    pub async fn admin_list(&self) -> Result<Vec<OrderListResponse>, AppError> {
        self.order_repo.list_all().await
    }

    pub async fn admin_detail(&self, order_id: i64) -> Result<AdminOrderDetail, AppError> {
        let order = self
            .order_repo
            .find_order(&self.pool, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        let items = self.order_repo.items_for_order(&self.pool, order.id).await?;
        let user = self.user_repo.find_by_id(order.user_id).await?;
        let receipt = self
            .billing_repo
            .latest_receipt_for_order(&self.pool, order.id)
            .await?;
        let payment = self
            .billing_repo
            .canonical_payment_for_order(&self.pool, order.id)
            .await?;

        Ok(AdminOrderDetail {
            id: order.id,
            user_id: order.user_id,
            user_email: user.as_ref().map(|u| u.email.clone()),
            user_name: user.map(|u| u.full_name),
            status: order.status,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address,
            phone: order.phone,
            created_at: order.created_at,
            items,
            receipt,
            payment,
        })
    }

    async fn order_response(&self, order: Order) -> Result<OrderResponse, AppError> {
        let items = self.order_repo.items_for_order(&self.pool, order.id).await?;
        let receipt = self
            .billing_repo
            .latest_receipt_for_order(&self.pool, order.id)
            .await?;

        Ok(OrderResponse {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address,
            phone: order.phone,
            created_at: order.created_at,
            items,
            has_receipt: receipt.is_some(),
            receipt_status: receipt.map(|r| r.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{
        order_service, seed_pack_variant, seed_product, seed_user, FailingNotifier,
        RecordingNotifier,
    };
    use crate::models::order::CartLinePayload;
    use sqlx::SqlitePool;

    fn payload(lines: Vec<CartLinePayload>) -> CreateOrderPayload {
        CreateOrderPayload {
            items: lines,
            delivery_address: "Rua das Laranjeiras, 42".into(),
            phone: "+5511999990000".into(),
            payment_method: "etransfer".into(),
        }
    }

    fn product_line(product_id: i64, qty: i64) -> CartLinePayload {
        CartLinePayload {
            product_id: Some(product_id),
            pack_variant_id: None,
            qty,
        }
    }

    fn pack_line(variant_id: i64, qty: i64) -> CartLinePayload {
        CartLinePayload {
            product_id: None,
            pack_variant_id: Some(variant_id),
            qty,
        }
    }

    async fn stock_of(pool: &SqlitePool, product_id: i64) -> i64 {
        let (stock,): (i64,) = sqlx::query_as("SELECT stock_qty FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap();
        stock
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[sqlx::test]
    async fn cria_pedido_com_itens_pagamento_e_baixa_de_estoque(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let arroz = seed_product(&pool, "Arroz", 2500, 10).await;
        let feijao = seed_product(&pool, "Feijão", 800, 10).await;
        let variant_id =
            seed_pack_variant(&pool, "Cesta", "Média", 5000, &[(arroz.id, 1), (feijao.id, 2)]).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let order = service
            .create_order(
                cliente.id,
                &payload(vec![product_line(arroz.id, 2), pack_line(variant_id, 1)]),
            )
            .await
            .unwrap();

        // Total = 2×2500 + 1×5000, sempre com preço do servidor.
        assert_eq!(order.total_amount, 10000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(
            order.total_amount,
            order.items.iter().map(|i| i.line_total).sum::<i64>()
        );
        assert_eq!(order.items[1].name_snapshot, "Cesta - Média");
        assert_eq!(order.items[1].product_id, None);

        // Estoque: arroz debitado pela linha avulsa E pelo combo.
        assert_eq!(stock_of(&pool, arroz.id).await, 10 - 2 - 1);
        assert_eq!(stock_of(&pool, feijao.id).await, 10 - 2);

        // Um pagamento pendente criado na mesma transação.
        let (status,): (String,) =
            sqlx::query_as("SELECT status FROM payments WHERE order_id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "pending");
    }

    #[sqlx::test]
    async fn falha_no_commit_desfaz_tudo(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        // Estoque 1: cada linha passa na validação isolada, mas o débito
        // agregado (2) estoura no commit.
        let produto = seed_product(&pool, "Último item", 500, 1).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let result = service
            .create_order(
                cliente.id,
                &payload(vec![product_line(produto.id, 1), product_line(produto.id, 1)]),
            )
            .await;

        assert!(matches!(result, Err(AppError::InsufficientStock(_))));

        // Nada sobreviveu: nem pedido, nem item, nem pagamento, nem
        // movimentação, nem débito.
        assert_eq!(count(&pool, "orders").await, 0);
        assert_eq!(count(&pool, "order_items").await, 0);
        assert_eq!(count(&pool, "payments").await, 0);
        assert_eq!(count(&pool, "stock_movements").await, 0);
        assert_eq!(stock_of(&pool, produto.id).await, 1);
    }

    #[sqlx::test]
    async fn dois_pedidos_concorrentes_nao_estouram_o_estoque(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let beto = seed_user(&pool, "beto@example.com", UserRole::Customer).await;
        let produto = seed_product(&pool, "Unidade única", 500, 1).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let carrinho = payload(vec![product_line(produto.id, 1)]);

        let (r1, r2) = tokio::join!(
            service.create_order(ana.id, &carrinho),
            service.create_order(beto.id, &carrinho),
        );

        // Exatamente um commit; o perdedor falha com estoque
        // insuficiente e não deixa linha nenhuma.
        let sucessos = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(sucessos, 1);
        let vencedor = if r1.is_ok() { r1.unwrap() } else { r2.unwrap() };
        assert_eq!(vencedor.total_amount, 500);

        assert_eq!(stock_of(&pool, produto.id).await, 0);
        assert_eq!(count(&pool, "orders").await, 1);
        assert_eq!(count(&pool, "order_items").await, 1);
        assert_eq!(count(&pool, "payments").await, 1);
    }

    #[sqlx::test]
    async fn caminho_feliz_de_transicoes_notifica_cada_etapa(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let service = order_service(&pool, notifier.clone());
        let order = service
            .create_order(cliente.id, &payload(vec![product_line(produto.id, 1)]))
            .await
            .unwrap();

        for status in ["paid", "confirmed", "out_for_delivery"] {
            service.transition_status(order.id, status, &admin).await.unwrap();
        }

        let sent = notifier.sent.lock().unwrap();
        let events: Vec<OrderEvent> = sent.iter().map(|(_, event, _)| *event).collect();
        assert_eq!(
            events,
            vec![OrderEvent::Paid, OrderEvent::Confirmed, OrderEvent::OutForDelivery]
        );
        assert!(sent.iter().all(|(phone, _, id)| phone == "+5511999990000" && *id == order.id));
    }

    #[sqlx::test]
    async fn pular_etapa_ou_status_desconhecido_e_rejeitado(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let order = service
            .create_order(cliente.id, &payload(vec![product_line(produto.id, 1)]))
            .await
            .unwrap();

        // pending → out_for_delivery pula etapas.
        let result = service.transition_status(order.id, "out_for_delivery", &admin).await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));

        // Valor fora do conjunto conhecido.
        let result = service.transition_status(order.id, "shipped", &admin).await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));

        // O pedido continua intocado.
        let detail = service.admin_detail(order.id).await.unwrap();
        assert_eq!(detail.status, OrderStatus::Pending);
    }

    #[sqlx::test]
    async fn cancelamento_devolve_o_estoque_inclusive_dos_combos(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let arroz = seed_product(&pool, "Arroz", 2500, 10).await;
        let feijao = seed_product(&pool, "Feijão", 800, 10).await;
        let variant_id =
            seed_pack_variant(&pool, "Cesta", "Média", 5000, &[(arroz.id, 2), (feijao.id, 1)]).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let order = service
            .create_order(cliente.id, &payload(vec![pack_line(variant_id, 2)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&pool, arroz.id).await, 6);
        assert_eq!(stock_of(&pool, feijao.id).await, 8);

        service.transition_status(order.id, "paid", &admin).await.unwrap();
        service.transition_status(order.id, "cancelled", &admin).await.unwrap();

        assert_eq!(stock_of(&pool, arroz.id).await, 10);
        assert_eq!(stock_of(&pool, feijao.id).await, 10);

        let (estornos,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM stock_movements WHERE order_id = ?1 AND reason = 'cancel_return'",
        )
        .bind(order.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(estornos, 2);
    }

    #[sqlx::test]
    async fn falha_de_notificacao_nao_desfaz_a_transicao(pool: SqlitePool) {
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let service = order_service(&pool, Arc::new(FailingNotifier));
        let order = service
            .create_order(cliente.id, &payload(vec![product_line(produto.id, 1)]))
            .await
            .unwrap();

        let updated = service.transition_status(order.id, "paid", &admin).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Paid);
    }

    #[sqlx::test]
    async fn cliente_nao_acessa_pedido_de_outro_cliente(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let beto = seed_user(&pool, "beto@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        let order = service
            .create_order(ana.id, &payload(vec![product_line(produto.id, 1)]))
            .await
            .unwrap();

        assert!(matches!(
            service.get_order(order.id, &beto).await,
            Err(AppError::AccessDenied)
        ));
        assert!(service.get_order(order.id, &ana).await.is_ok());
        assert!(service.get_order(order.id, &admin).await.is_ok());
    }

    #[sqlx::test]
    async fn listagem_do_cliente_traz_so_os_pedidos_dele(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let beto = seed_user(&pool, "beto@example.com", UserRole::Customer).await;
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let service = order_service(&pool, Arc::new(RecordingNotifier::default()));
        service
            .create_order(ana.id, &payload(vec![product_line(produto.id, 2)]))
            .await
            .unwrap();
        service
            .create_order(beto.id, &payload(vec![product_line(produto.id, 1)]))
            .await
            .unwrap();

        let da_ana = service.list_my(&ana).await.unwrap();
        assert_eq!(da_ana.len(), 1);
        assert_eq!(da_ana[0].item_count, 1);
        assert_eq!(da_ana[0].total_amount, 5000);

        assert_eq!(service.admin_list().await.unwrap().len(), 2);
    }
}
