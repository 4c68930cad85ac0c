// src/services/catalog_service.rs

use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::catalog::{
        Category, CreateProductPayload, Pack, PackResponse, PackVariant, PackVariantItem,
        Product, ProductResponse, UpdateProductPayload,
    },
    services::inventory::InventoryService,
};

// Operações de catálogo. As leituras públicas só enxergam o que está
// ativo; o CRUD é do admin. Mudança de estoque via admin passa pelo
// InventoryService, nunca por atribuição direta.
#[derive(Clone)]
pub struct CatalogService {
    pool: SqlitePool,
    catalog_repo: CatalogRepository,
    inventory: InventoryService,
}

impl CatalogService {
    pub fn new(pool: SqlitePool, catalog_repo: CatalogRepository, inventory: InventoryService) -> Self {
        Self {
            pool,
            catalog_repo,
            inventory,
        }
    }

    // ---
    // Leituras
    // ---

    pub async fn list_products_public(&self) -> Result<Vec<ProductResponse>, AppError> {
        self.catalog_repo.list_products(true).await
    }

    pub async fn list_products_admin(&self) -> Result<Vec<ProductResponse>, AppError> {
        self.catalog_repo.list_products(false).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.catalog_repo.list_categories().await
    }

    pub async fn list_packs(&self) -> Result<Vec<PackResponse>, AppError> {
        self.catalog_repo.list_packs().await
    }

    // ---
    // CRUD de produtos
    // ---

    pub async fn create_product(
        &self,
        payload: &CreateProductPayload,
    ) -> Result<ProductResponse, AppError> {
        if let Some(category_id) = payload.category_id {
            if !self.catalog_repo.category_exists(&self.pool, category_id).await? {
                return Err(AppError::CategoryNotFound);
            }
        }

        let mut tx = self.pool.begin().await?;

        let product = self
            .catalog_repo
            .create_product(
                &mut *tx,
                &payload.name,
                payload.price,
                payload.stock_qty,
                payload.image_url.as_deref(),
                payload.category_id,
            )
            .await?;

        // Estoque inicial entra no livro-razão junto com a criação.
        if payload.stock_qty > 0 {
            self.inventory
                .record_initial(&mut *tx, product.id, payload.stock_qty)
                .await?;
        }

        tx.commit().await?;

        self.product_response(product).await
    }

    pub async fn update_product(
        &self,
        product_id: i64,
        payload: &UpdateProductPayload,
    ) -> Result<ProductResponse, AppError> {
        let mut product = self
            .catalog_repo
            .find_product(&self.pool, product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        if let Some(name) = &payload.name {
            product.name = name.clone();
        }
        if let Some(price) = payload.price {
            product.price = price;
        }
        if let Some(image_url) = &payload.image_url {
            product.image_url = Some(image_url.clone());
        }
        if let Some(category_id) = payload.category_id {
            if !self.catalog_repo.category_exists(&self.pool, category_id).await? {
                return Err(AppError::CategoryNotFound);
            }
            product.category_id = Some(category_id);
        }
        if let Some(is_active) = payload.is_active {
            product.is_active = is_active;
        }

        let mut tx = self.pool.begin().await?;

        let mut updated = self.catalog_repo.update_product(&mut *tx, &product).await?;

        // O campo stock_qty do payload vira uma correção de inventário,
        // com rastro no livro-razão.
        if let Some(new_stock) = payload.stock_qty {
            self.inventory.correct_stock(&mut tx, product.id, new_stock).await?;
            updated.stock_qty = new_stock;
        }

        tx.commit().await?;

        self.product_response(updated).await
    }

    // Soft delete, preservando os snapshots históricos.
    pub async fn deactivate_product(&self, product_id: i64) -> Result<(), AppError> {
        let found = self
            .catalog_repo
            .deactivate_product(&self.pool, product_id)
            .await?;
        if !found {
            return Err(AppError::ProductNotFound(product_id));
        }
        Ok(())
    }

    // ---
    // Categorias e packs
    // ---

    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        self.catalog_repo.create_category(&self.pool, name).await
    }

    pub async fn create_pack(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Pack, AppError> {
        self.catalog_repo.create_pack(&self.pool, name, description).await
    }

    pub async fn create_pack_variant(
        &self,
        pack_id: i64,
        name: &str,
        price: i64,
    ) -> Result<PackVariant, AppError> {
        self.catalog_repo
            .find_pack(&self.pool, pack_id)
            .await?
            .ok_or(AppError::PackNotFound)?;

        self.catalog_repo
            .create_pack_variant(&self.pool, pack_id, name, price)
            .await
    }

    // Invariante do modelo: todo componente referencia um produto
    // existente. A checagem acontece aqui, antes do insert.
    pub async fn add_pack_variant_item(
        &self,
        variant_id: i64,
        product_id: i64,
        qty: i64,
    ) -> Result<PackVariantItem, AppError> {
        self.catalog_repo
            .get_pack_variant(variant_id)
            .await?
            .ok_or(AppError::PackVariantNotFound(variant_id))?;

        self.catalog_repo
            .find_product(&self.pool, product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        self.catalog_repo
            .add_pack_variant_item(&self.pool, variant_id, product_id, qty)
            .await
    }

    async fn product_response(&self, product: Product) -> Result<ProductResponse, AppError> {
        let category_name = match product.category_id {
            Some(category_id) => {
                sqlx::query_as::<_, (String,)>("SELECT name FROM categories WHERE id = ?1")
                    .bind(category_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|(name,)| name)
            }
            None => None,
        };

        Ok(ProductResponse {
            id: product.id,
            name: product.name,
            price: product.price,
            stock_qty: product.stock_qty,
            image_url: product.image_url,
            category_id: product.category_id,
            is_active: product.is_active,
            category_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::{seed_pack_variant, seed_product};
    use crate::db::InventoryRepository;
    use sqlx::SqlitePool;

    fn service(pool: &SqlitePool) -> CatalogService {
        CatalogService::new(
            pool.clone(),
            CatalogRepository::new(pool.clone()),
            InventoryService::new(InventoryRepository::new(pool.clone())),
        )
    }

    #[sqlx::test]
    async fn cria_produto_com_categoria_e_estoque_inicial(pool: SqlitePool) {
        let catalog = service(&pool);
        let categoria = catalog.create_category("Grãos").await.unwrap();

        let produto = catalog
            .create_product(&CreateProductPayload {
                name: "Arroz 5kg".into(),
                price: 2500,
                stock_qty: 40,
                image_url: None,
                category_id: Some(categoria.id),
            })
            .await
            .unwrap();

        assert_eq!(produto.category_name.as_deref(), Some("Grãos"));
        assert_eq!(produto.stock_qty, 40);

        let (movimentos,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1 AND reason = 'initial_stock'",
        )
        .bind(produto.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(movimentos, 1);
    }

    #[sqlx::test]
    async fn categoria_inexistente_e_rejeitada(pool: SqlitePool) {
        let catalog = service(&pool);
        let result = catalog
            .create_product(&CreateProductPayload {
                name: "Sem categoria".into(),
                price: 100,
                stock_qty: 0,
                image_url: None,
                category_id: Some(999),
            })
            .await;
        assert!(matches!(result, Err(AppError::CategoryNotFound)));
    }

    #[sqlx::test]
    async fn atualizacao_parcial_preserva_o_resto(pool: SqlitePool) {
        let catalog = service(&pool);
        let produto = seed_product(&pool, "Arroz", 2500, 10).await;

        let atualizado = catalog
            .update_product(
                produto.id,
                &UpdateProductPayload {
                    name: None,
                    price: Some(2700),
                    stock_qty: Some(25),
                    image_url: None,
                    category_id: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(atualizado.name, "Arroz");
        assert_eq!(atualizado.price, 2700);
        assert_eq!(atualizado.stock_qty, 25);

        // O acerto de estoque deixou rastro de correção.
        let (delta,): (i64,) = sqlx::query_as(
            "SELECT quantity_changed FROM stock_movements WHERE product_id = ?1 AND reason = 'correction'",
        )
        .bind(produto.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(delta, 15);
    }

    #[sqlx::test]
    async fn desativar_tira_do_catalogo_publico_sem_apagar(pool: SqlitePool) {
        let catalog = service(&pool);
        let produto = seed_product(&pool, "Descontinuado", 900, 3).await;

        catalog.deactivate_product(produto.id).await.unwrap();

        assert!(catalog.list_products_public().await.unwrap().is_empty());
        let todos = catalog.list_products_admin().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert!(!todos[0].is_active);

        assert!(matches!(
            catalog.deactivate_product(999).await,
            Err(AppError::ProductNotFound(999))
        ));
    }

    #[sqlx::test]
    async fn montagem_de_pack_exige_produto_existente(pool: SqlitePool) {
        let catalog = service(&pool);
        let arroz = seed_product(&pool, "Arroz", 2500, 10).await;

        let pack = catalog.create_pack("Cesta Básica", Some("Itens essenciais")).await.unwrap();
        let variante = catalog.create_pack_variant(pack.id, "Pequena", 5000).await.unwrap();

        let item = catalog
            .add_pack_variant_item(variante.id, arroz.id, 2)
            .await
            .unwrap();
        assert_eq!(item.qty, 2);

        let result = catalog.add_pack_variant_item(variante.id, 999, 1).await;
        assert!(matches!(result, Err(AppError::ProductNotFound(999))));

        let result = catalog.create_pack_variant(999, "Órfã", 100).await;
        assert!(matches!(result, Err(AppError::PackNotFound)));
    }

    #[sqlx::test]
    async fn listagem_publica_de_packs_resolve_componentes(pool: SqlitePool) {
        let catalog = service(&pool);
        let arroz = seed_product(&pool, "Arroz", 2500, 10).await;
        let feijao = seed_product(&pool, "Feijão", 800, 10).await;
        seed_pack_variant(&pool, "Cesta", "Média", 6000, &[(arroz.id, 2), (feijao.id, 1)]).await;

        let packs = catalog.list_packs().await.unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].variants.len(), 1);
        let items = &packs[0].variants[0].items;
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.product_name == "Arroz" && i.qty == 2));
    }
}
