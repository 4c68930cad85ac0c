// src/services/inventory.rs

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::inventory::StockMovementReason,
};

// O guardião do invariante de estoque: stock_qty nunca fica negativo e
// só muda pelas primitivas daqui, cada uma deixando rastro no
// livro-razão dentro da transação de quem chama.
#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository) -> Self {
        Self { inventory_repo }
    }

    // Consulta de disponibilidade: existe, está ativo e tem saldo.
    // Usada pelo montador, que valida sem debitar.
    pub async fn check_stock<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        requested_qty: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let available = match self.inventory_repo.stock_of(executor, product_id).await? {
            Some((stock_qty, true)) => stock_qty >= requested_qty,
            _ => false,
        };
        Ok(available)
    }

    // Débito atômico: a checagem de saldo e o decremento são um único
    // UPDATE condicional, então dois pedidos concorrentes pela última
    // unidade nunca passam os dois. Falhou = a transação inteira do
    // chamador sofre rollback.
    pub async fn reduce_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: i64,
        qty: i64,
        order_id: i64,
    ) -> Result<(), AppError> {
        let reduced = self
            .inventory_repo
            .try_reduce_stock(&mut *conn, product_id, qty)
            .await?;

        if !reduced {
            let name = self
                .inventory_repo
                .product_name(&mut *conn, product_id)
                .await?
                .unwrap_or_else(|| format!("produto {product_id}"));
            return Err(AppError::InsufficientStock(name));
        }

        self.inventory_repo
            .record_movement(&mut *conn, product_id, Some(order_id), -qty, StockMovementReason::Sale)
            .await?;

        Ok(())
    }

    // Estorno de um pedido cancelado: devolve exatamente o que as
    // movimentações de venda daquele pedido debitaram (inclusive os
    // componentes dos combos, que os order_items não guardam).
    pub async fn release_for_order(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> Result<(), AppError> {
        let sold = self
            .inventory_repo
            .movements_for_order(&mut *conn, order_id, StockMovementReason::Sale)
            .await?;

        for (product_id, total_delta) in sold {
            // total_delta é negativo (venda); devolve o módulo.
            let restore_qty = -total_delta;
            self.inventory_repo
                .restore_stock(&mut *conn, product_id, restore_qty)
                .await?;
            self.inventory_repo
                .record_movement(
                    &mut *conn,
                    product_id,
                    Some(order_id),
                    restore_qty,
                    StockMovementReason::CancelReturn,
                )
                .await?;
        }

        Ok(())
    }

    // Ajuste manual do admin: fixa o saldo num valor e registra o delta
    // como correção.
    pub async fn correct_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: i64,
        new_qty: i64,
    ) -> Result<(), AppError> {
        let (current, _) = self
            .inventory_repo
            .stock_of(&mut *conn, product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        let delta = new_qty - current;
        if delta == 0 {
            return Ok(());
        }

        self.inventory_repo
            .set_stock(&mut *conn, product_id, new_qty)
            .await?;
        self.inventory_repo
            .record_movement(&mut *conn, product_id, None, delta, StockMovementReason::Correction)
            .await?;

        Ok(())
    }

    // Registra o estoque inicial de um produto recém-criado.
    pub async fn record_initial<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        qty: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.inventory_repo
            .record_movement(executor, product_id, None, qty, StockMovementReason::InitialStock)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{seed_order_row, seed_product, seed_user};
    use crate::models::auth::UserRole;
    use sqlx::SqlitePool;

    fn service(pool: &SqlitePool) -> InventoryService {
        InventoryService::new(InventoryRepository::new(pool.clone()))
    }

    #[sqlx::test]
    async fn check_stock_exige_produto_ativo_com_saldo(pool: SqlitePool) {
        let inventory = service(&pool);
        let ativo = seed_product(&pool, "Arroz 5kg", 2500, 3).await;

        assert!(inventory.check_stock(&pool, ativo.id, 3).await.unwrap());
        assert!(!inventory.check_stock(&pool, ativo.id, 4).await.unwrap());
        assert!(!inventory.check_stock(&pool, 9999, 1).await.unwrap());

        sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(ativo.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(!inventory.check_stock(&pool, ativo.id, 1).await.unwrap());
    }

    #[sqlx::test]
    async fn reduce_stock_debita_e_registra_movimentacao(pool: SqlitePool) {
        let inventory = service(&pool);
        let produto = seed_product(&pool, "Feijão", 800, 10).await;
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let order_id = seed_order_row(&pool, cliente.id).await;

        let mut conn = pool.acquire().await.unwrap();
        inventory
            .reduce_stock(&mut conn, produto.id, 4, order_id)
            .await
            .unwrap();
        drop(conn);

        let (saldo,): (i64,) =
            sqlx::query_as("SELECT stock_qty FROM products WHERE id = ?1")
                .bind(produto.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(saldo, 6);

        let (delta,): (i64,) = sqlx::query_as(
            "SELECT quantity_changed FROM stock_movements WHERE product_id = ?1 AND reason = 'sale'",
        )
        .bind(produto.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(delta, -4);
    }

    #[sqlx::test]
    async fn reduce_stock_alem_do_saldo_falha_sem_debitar(pool: SqlitePool) {
        let inventory = service(&pool);
        let produto = seed_product(&pool, "Café", 1500, 2).await;
        let cliente = seed_user(&pool, "ana@example.com", UserRole::Customer).await;
        let order_id = seed_order_row(&pool, cliente.id).await;

        let mut conn = pool.acquire().await.unwrap();
        let result = inventory.reduce_stock(&mut conn, produto.id, 3, order_id).await;
        drop(conn);

        assert!(matches!(result, Err(AppError::InsufficientStock(nome)) if nome == "Café"));

        let (saldo,): (i64,) =
            sqlx::query_as("SELECT stock_qty FROM products WHERE id = ?1")
                .bind(produto.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(saldo, 2);
    }

    #[sqlx::test]
    async fn correct_stock_registra_o_delta(pool: SqlitePool) {
        let inventory = service(&pool);
        let produto = seed_product(&pool, "Açúcar", 600, 5).await;

        let mut conn = pool.acquire().await.unwrap();
        inventory.correct_stock(&mut conn, produto.id, 12).await.unwrap();
        drop(conn);

        let (saldo,): (i64,) =
            sqlx::query_as("SELECT stock_qty FROM products WHERE id = ?1")
                .bind(produto.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(saldo, 12);

        let (delta,): (i64,) = sqlx::query_as(
            "SELECT quantity_changed FROM stock_movements WHERE product_id = ?1 AND reason = 'correction'",
        )
        .bind(produto.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(delta, 7);
    }
}
