// src/services/billing_service.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::{BillingRepository, OrderRepository},
    models::auth::{User, UserRole},
    models::billing::{Payment, PaymentStatus, Receipt, ReceiptStatus},
    models::order::OrderStatus,
    services::storage::ReceiptStorage,
};

// Reconciliação de pagamentos: liga o comprovante enviado pelo cliente
// à verificação do pagamento e ao avanço do pedido.
#[derive(Clone)]
pub struct BillingService {
    pool: SqlitePool,
    billing_repo: BillingRepository,
    order_repo: OrderRepository,
    storage: ReceiptStorage,
}

impl BillingService {
    pub fn new(
        pool: SqlitePool,
        billing_repo: BillingRepository,
        order_repo: OrderRepository,
        storage: ReceiptStorage,
    ) -> Self {
        Self {
            pool,
            billing_repo,
            order_repo,
            storage,
        }
    }

    // Upload do comprovante: só o dono do pedido pode enviar. O arquivo
    // vai para o Blob Store ANTES de abrirmos qualquer transação — rede
    // nunca fica dentro de transação.
    pub async fn upload_receipt(
        &self,
        order_id: i64,
        uploading_user: &User,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Receipt, AppError> {
        let order = self
            .order_repo
            .find_order(&self.pool, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if order.user_id != uploading_user.id {
            return Err(AppError::AccessDenied);
        }

        let stored = self.storage.store(original_name, bytes).await?;

        let receipt = self
            .billing_repo
            .insert_receipt(
                &self.pool,
                order.id,
                uploading_user.id,
                &stored.url,
                &stored.key,
                Utc::now(),
            )
            .await?;

        tracing::info!(order_id, receipt_id = receipt.id, "Comprovante recebido");
        Ok(receipt)
    }

    // O comprovante mais recente do pedido, para o dono ou o admin.
    pub async fn get_order_receipt(
        &self,
        order_id: i64,
        requesting_user: &User,
    ) -> Result<Receipt, AppError> {
        let order = self
            .order_repo
            .find_order(&self.pool, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if requesting_user.role != UserRole::Admin && order.user_id != requesting_user.id {
            return Err(AppError::AccessDenied);
        }

        self.billing_repo
            .latest_receipt_for_order(&self.pool, order_id)
            .await?
            .ok_or(AppError::ReceiptNotFound)
    }

    // Revisão do admin. A aprovação é a atualização de três entidades em
    // uma transação só: comprovante aprovado, pagamento canônico
    // verificado e pedido avançado para paid. Nunca existe um estado
    // intermediário observável com pagamento verificado e pedido
    // pendente (ou vice-versa).
    pub async fn review_receipt(
        &self,
        receipt_id: i64,
        new_status_raw: &str,
        admin_note: Option<&str>,
        acting_admin: &User,
    ) -> Result<Receipt, AppError> {
        let new_status = ReceiptStatus::parse(new_status_raw)?;

        let mut tx = self.pool.begin().await?;

        let receipt = self
            .billing_repo
            .find_receipt(&mut *tx, receipt_id)
            .await?
            .ok_or(AppError::ReceiptNotFound)?;

        if new_status == ReceiptStatus::Approved {
            let order = self
                .order_repo
                .find_order(&mut *tx, receipt.order_id)
                .await?
                .ok_or(AppError::OrderNotFound)?;

            // Pedido cancelado não volta a andar por causa de um
            // comprovante atrasado.
            if order.status == OrderStatus::Cancelled {
                return Err(AppError::InvalidStatus("cancelled".to_string()));
            }

            if let Some(payment) = self
                .billing_repo
                .canonical_payment_for_order(&mut *tx, receipt.order_id)
                .await?
            {
                if payment.status != PaymentStatus::Verified {
                    self.billing_repo
                        .mark_payment_verified(&mut *tx, payment.id, acting_admin.id, Utc::now())
                        .await?;
                }
            }

            if order.status == OrderStatus::Pending {
                self.order_repo
                    .update_status(&mut *tx, order.id, OrderStatus::Paid)
                    .await?;
            }
        }

        let updated = self
            .billing_repo
            .update_receipt_review(&mut *tx, receipt_id, new_status, admin_note)
            .await?;

        tx.commit().await?;

        tracing::info!(
            receipt_id,
            status = new_status_raw,
            admin_id = acting_admin.id,
            "Comprovante revisado"
        );
        Ok(updated)
    }

    // Override direto do admin sobre o pagamento, independente do fluxo
    // de comprovante. Verificação carimba quem verificou e quando.
    pub async fn review_payment(
        &self,
        payment_id: i64,
        new_status_raw: &str,
        acting_admin: &User,
    ) -> Result<Payment, AppError> {
        let new_status = PaymentStatus::parse(new_status_raw)?;

        let payment = self
            .billing_repo
            .find_payment(&self.pool, payment_id)
            .await?
            .ok_or(AppError::PaymentNotFound)?;

        let updated = if new_status == PaymentStatus::Verified {
            self.billing_repo
                .mark_payment_verified(&self.pool, payment.id, acting_admin.id, Utc::now())
                .await?
        } else {
            self.billing_repo
                .update_payment_status(&self.pool, payment.id, new_status)
                .await?
        };

        tracing::info!(
            payment_id,
            status = new_status_raw,
            admin_id = acting_admin.id,
            "Pagamento revisado"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{
        billing_service, order_service, seed_product, seed_user, RecordingNotifier,
    };
    use crate::models::order::{CartLinePayload, CreateOrderPayload, OrderResponse};
    use sqlx::SqlitePool;
    use std::sync::Arc;

    fn storage(dir: &std::path::Path) -> ReceiptStorage {
        ReceiptStorage::new(dir.to_path_buf(), "http://localhost:3000".into(), 5)
    }

    async fn seed_order(pool: &SqlitePool, user_id: i64) -> OrderResponse {
        let produto = seed_product(pool, "Arroz", 2500, 10).await;
        let service = order_service(pool, Arc::new(RecordingNotifier::default()));
        service
            .create_order(
                user_id,
                &CreateOrderPayload {
                    items: vec![CartLinePayload {
                        product_id: Some(produto.id),
                        pack_variant_id: None,
                        qty: 1,
                    }],
                    delivery_address: "Rua A, 10".into(),
                    phone: "+5511999990000".into(),
                    payment_method: "etransfer".into(),
                },
            )
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn upload_e_apenas_do_dono_do_pedido(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let beto = seed_user(&pool, "beto@example.com", UserRole::Customer).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));

        let result = billing
            .upload_receipt(order.id, &beto, "comprovante.png", b"png")
            .await;
        assert!(matches!(result, Err(AppError::AccessDenied)));

        let receipt = billing
            .upload_receipt(order.id, &ana, "comprovante.png", b"png")
            .await
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Submitted);
        assert!(receipt.file_url.contains(&receipt.file_key));

        // O dono e o admin conseguem buscar; quem é de fora, não.
        assert!(billing.get_order_receipt(order.id, &ana).await.is_ok());
        assert!(matches!(
            billing.get_order_receipt(order.id, &beto).await,
            Err(AppError::AccessDenied)
        ));
    }

    #[sqlx::test]
    async fn aprovar_comprovante_verifica_pagamento_e_avanca_o_pedido(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));
        let receipt = billing
            .upload_receipt(order.id, &ana, "comprovante.jpg", b"jpg")
            .await
            .unwrap();

        let updated = billing
            .review_receipt(receipt.id, "approved", Some("ok"), &admin)
            .await
            .unwrap();
        assert_eq!(updated.status, ReceiptStatus::Approved);
        assert_eq!(updated.admin_note.as_deref(), Some("ok"));

        // Invariante: pagamento verificado ⇔ pedido pago, nunca um sem o
        // outro.
        let (order_status,): (String,) =
            sqlx::query_as("SELECT status FROM orders WHERE id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(order_status, "paid");

        let payment: Payment =
            sqlx::query_as("SELECT * FROM payments WHERE order_id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(payment.status, PaymentStatus::Verified);
        assert_eq!(payment.verified_by, Some(admin.id));
        assert!(payment.verified_at.is_some());
    }

    #[sqlx::test]
    async fn rejeitar_comprovante_nao_toca_pagamento_nem_pedido(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));
        let receipt = billing
            .upload_receipt(order.id, &ana, "borrado.jpg", b"jpg")
            .await
            .unwrap();

        let updated = billing
            .review_receipt(receipt.id, "rejected", Some("ilegível"), &admin)
            .await
            .unwrap();
        assert_eq!(updated.status, ReceiptStatus::Rejected);

        let (order_status,): (String,) =
            sqlx::query_as("SELECT status FROM orders WHERE id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(order_status, "pending");

        let payment: Payment =
            sqlx::query_as("SELECT * FROM payments WHERE order_id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[sqlx::test]
    async fn status_de_comprovante_fora_do_conjunto_e_rejeitado(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));
        let receipt = billing
            .upload_receipt(order.id, &ana, "c.png", b"png")
            .await
            .unwrap();

        let result = billing.review_receipt(receipt.id, "verified", None, &admin).await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));
    }

    #[sqlx::test]
    async fn comprovante_de_pedido_cancelado_nao_e_aprovavel(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));
        let receipt = billing
            .upload_receipt(order.id, &ana, "c.png", b"png")
            .await
            .unwrap();

        let orders = order_service(&pool, Arc::new(RecordingNotifier::default()));
        orders.transition_status(order.id, "cancelled", &admin).await.unwrap();

        let result = billing.review_receipt(receipt.id, "approved", None, &admin).await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));

        // Nada mudou no pagamento.
        let payment: Payment =
            sqlx::query_as("SELECT * FROM payments WHERE order_id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[sqlx::test]
    async fn override_de_pagamento_carimba_verificador(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));

        let payment: Payment =
            sqlx::query_as("SELECT * FROM payments WHERE order_id = ?1")
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();

        let updated = billing.review_payment(payment.id, "verified", &admin).await.unwrap();
        assert_eq!(updated.status, PaymentStatus::Verified);
        assert_eq!(updated.verified_by, Some(admin.id));
        assert!(updated.verified_at.is_some());

        let result = billing.review_payment(payment.id, "approved", &admin).await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));

        let result = billing.review_payment(9999, "failed", &admin).await;
        assert!(matches!(result, Err(AppError::PaymentNotFound)));
    }

    #[sqlx::test]
    async fn o_comprovante_mais_recente_e_o_que_vale(pool: SqlitePool) {
        let ana = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let order = seed_order(&pool, ana.id).await;

        let dir = tempfile::tempdir().unwrap();
        let billing = billing_service(&pool, storage(dir.path()));

        let primeiro = billing
            .upload_receipt(order.id, &ana, "v1.png", b"v1")
            .await
            .unwrap();
        let segundo = billing
            .upload_receipt(order.id, &ana, "v2.png", b"v2")
            .await
            .unwrap();

        let atual = billing.get_order_receipt(order.id, &ana).await.unwrap();
        assert_eq!(atual.id, segundo.id);
        assert_ne!(atual.id, primeiro.id);
    }
}
