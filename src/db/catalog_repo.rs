// src/db/catalog_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::catalog::{
        Category, Pack, PackResponse, PackVariant, PackVariantDetail, PackVariantItem,
        PackVariantItemResponse, PackVariantResponse, Product, ProductResponse,
    },
};

// Registro do catálogo: produtos, categorias e packs. Leituras usam a
// pool (estado já commitado); escritas recebem um executor para poderem
// rodar dentro da transação de quem chama.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---
    // Produtos
    // ---

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn find_active_product<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(product)
    }

    // Lista com o nome da categoria já resolvido. O público só enxerga
    // produtos ativos; o admin enxerga tudo.
    pub async fn list_products(&self, only_active: bool) -> Result<Vec<ProductResponse>, AppError> {
        let sql = if only_active {
            r#"
            SELECT p.id, p.name, p.price, p.stock_qty, p.image_url, p.category_id,
                   p.is_active, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active = 1
            ORDER BY p.name ASC
            "#
        } else {
            r#"
            SELECT p.id, p.name, p.price, p.stock_qty, p.image_url, p.category_id,
                   p.is_active, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            ORDER BY p.name ASC
            "#
        };
        let products = sqlx::query_as::<_, ProductResponse>(sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        price: i64,
        stock_qty: i64,
        image_url: Option<&str>,
        category_id: Option<i64>,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, stock_qty, image_url, category_id, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(price)
        .bind(stock_qty)
        .bind(image_url)
        .bind(category_id)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }

    // Atualiza os campos de catálogo do produto. stock_qty fica de fora
    // de propósito: estoque só muda pelas primitivas do InventoryService.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        product: &Product,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = ?2, price = ?3, image_url = ?4, category_id = ?5, is_active = ?6
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.image_url.as_deref())
        .bind(product.category_id)
        .bind(product.is_active)
        .fetch_one(executor)
        .await?;
        Ok(updated)
    }

    // Soft delete: o produto some do catálogo público mas os snapshots
    // históricos continuam apontando para ele.
    pub async fn deactivate_product<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    pub async fn category_exists<'e, E>(&self, executor: E, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found = sqlx::query_as::<_, (i64,)>("SELECT id FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        name: &str,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, created_at) VALUES (?1, ?2) RETURNING *",
        )
        .bind(name)
        .bind(chrono::Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(category)
    }

    // ---
    // Packs
    // ---

    pub async fn create_pack<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Pack, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let pack = sqlx::query_as::<_, Pack>(
            "INSERT INTO packs (name, description, is_active) VALUES (?1, ?2, 1) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(pack)
    }

    pub async fn find_pack<'e, E>(&self, executor: E, id: i64) -> Result<Option<Pack>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let pack = sqlx::query_as::<_, Pack>("SELECT * FROM packs WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(pack)
    }

    pub async fn create_pack_variant<'e, E>(
        &self,
        executor: E,
        pack_id: i64,
        name: &str,
        price: i64,
    ) -> Result<PackVariant, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let variant = sqlx::query_as::<_, PackVariant>(
            "INSERT INTO pack_variants (pack_id, name, price) VALUES (?1, ?2, ?3) RETURNING *",
        )
        .bind(pack_id)
        .bind(name)
        .bind(price)
        .fetch_one(executor)
        .await?;
        Ok(variant)
    }

    pub async fn add_pack_variant_item<'e, E>(
        &self,
        executor: E,
        variant_id: i64,
        product_id: i64,
        qty: i64,
    ) -> Result<PackVariantItem, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let item = sqlx::query_as::<_, PackVariantItem>(
            r#"
            INSERT INTO pack_variant_items (variant_id, product_id, qty)
            VALUES (?1, ?2, ?3)
            RETURNING *
            "#,
        )
        .bind(variant_id)
        .bind(product_id)
        .bind(qty)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    // Variante + nome do pack pai + componentes, como o montador de
    // pedidos precisa. Packs desativados não são vendáveis, então a
    // busca já filtra por is_active.
    pub async fn get_pack_variant(&self, id: i64) -> Result<Option<PackVariantDetail>, AppError> {
        let variant = sqlx::query_as::<_, PackVariant>(
            r#"
            SELECT v.*
            FROM pack_variants v
            JOIN packs p ON p.id = v.pack_id
            WHERE v.id = ?1 AND p.is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(variant) = variant else {
            return Ok(None);
        };

        let (pack_name,) =
            sqlx::query_as::<_, (String,)>("SELECT name FROM packs WHERE id = ?1")
                .bind(variant.pack_id)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, PackVariantItem>(
            "SELECT * FROM pack_variant_items WHERE variant_id = ?1",
        )
        .bind(variant.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PackVariantDetail {
            variant,
            pack_name,
            items,
        }))
    }

    // Listagem pública de packs ativos com variantes e componentes.
    pub async fn list_packs(&self) -> Result<Vec<PackResponse>, AppError> {
        let packs = sqlx::query_as::<_, Pack>(
            "SELECT * FROM packs WHERE is_active = 1 ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(packs.len());
        for pack in packs {
            let variants = sqlx::query_as::<_, PackVariant>(
                "SELECT * FROM pack_variants WHERE pack_id = ?1 ORDER BY price ASC",
            )
            .bind(pack.id)
            .fetch_all(&self.pool)
            .await?;

            let mut variant_responses = Vec::with_capacity(variants.len());
            for variant in variants {
                let items = sqlx::query_as::<_, (i64, String, i64)>(
                    r#"
                    SELECT i.product_id, p.name, i.qty
                    FROM pack_variant_items i
                    JOIN products p ON p.id = i.product_id
                    WHERE i.variant_id = ?1
                    "#,
                )
                .bind(variant.id)
                .fetch_all(&self.pool)
                .await?;

                variant_responses.push(PackVariantResponse {
                    id: variant.id,
                    name: variant.name,
                    price: variant.price,
                    items: items
                        .into_iter()
                        .map(|(product_id, product_name, qty)| PackVariantItemResponse {
                            product_id,
                            product_name,
                            qty,
                        })
                        .collect(),
                });
            }

            result.push(PackResponse {
                id: pack.id,
                name: pack.name,
                description: pack.description,
                variants: variant_responses,
            });
        }

        Ok(result)
    }
}
